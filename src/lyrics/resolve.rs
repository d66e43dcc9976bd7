//! Lyrics resolution pipeline: cache lookup, exact lrclib lookup, then
//! progressive fallback search, with a write-once cache behind it all.

use crate::lyrics::cache::LyricsCache;
use crate::lyrics::lrclib::LrclibTrack;
use crate::lyrics::types::{LyricsError, LyricsRecord, TrackIdentity};

/// Seam between the pipeline and the lookup API, so tests can script
/// responses and count calls.
#[allow(async_fn_in_trait)]
pub trait LyricsProvider {
    async fn get_exact(
        &self,
        identity: &TrackIdentity,
    ) -> Result<Option<LrclibTrack>, LyricsError>;

    async fn search(&self, track_name: &str) -> Result<Vec<LrclibTrack>, LyricsError>;
}

/// Resolve `identity` to a lyrics record.
///
/// The cache is authoritative on a hit (no freshness check). Store errors
/// are downgraded to misses: the cache is an optimization, never a hard
/// dependency. `NotFound` propagates uncached so a transient miss can be
/// retried on a later play.
pub async fn resolve<P: LyricsProvider>(
    cache: Option<&LyricsCache>,
    provider: &P,
    identity: &TrackIdentity,
) -> Result<LyricsRecord, LyricsError> {
    if let Some(cache) = cache {
        match cache.get(identity).await {
            Ok(Some(record)) => return Ok(record),
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, "cache read failed, treating as miss"),
        }
    }

    let resolved = match provider.get_exact(identity).await? {
        Some(track) if track.instrumental => LyricsRecord::instrumental(identity.clone()),
        Some(track) => match record_from_lookup(identity, &track) {
            Some(record) => record,
            // Entry exists but carries no lyrics at all.
            None => fallback_search(provider, identity).await?,
        },
        None => fallback_search(provider, identity).await?,
    };

    if let Some(cache) = cache
        && let Err(e) = cache.put_if_absent(&resolved).await
    {
        tracing::warn!(error = %e, "cache write failed, continuing uncached");
    }
    Ok(resolved)
}

/// Search with progressively relaxed titles: drop the last `n` words for
/// `n = 0..W-1` and keep only candidates whose artist contains the target
/// artist (case-insensitive). The first instrumental candidate wins
/// outright; otherwise the first candidate exposing any lyrics does. A
/// filtered page with no usable lyrics is terminal: probing further trims
/// from there would only produce false-positive matches.
async fn fallback_search<P: LyricsProvider>(
    provider: &P,
    identity: &TrackIdentity,
) -> Result<LyricsRecord, LyricsError> {
    let artist_lower = identity.artist.to_lowercase();
    for trimmed in title_trims(&identity.title) {
        let results = provider.search(&trimmed).await?;
        let candidates: Vec<&LrclibTrack> = results
            .iter()
            .filter(|track| {
                track
                    .artist_name
                    .as_deref()
                    .is_some_and(|a| a.to_lowercase().contains(&artist_lower))
            })
            .collect();
        let Some(first) = candidates.first() else {
            continue;
        };
        if first.instrumental {
            return Ok(LyricsRecord::instrumental(identity.clone()));
        }
        return candidates
            .iter()
            .find_map(|track| record_from_lookup(identity, track))
            .ok_or(LyricsError::NotFound);
    }
    Err(LyricsError::NotFound)
}

/// Title variants to probe, longest first, down to the first word.
fn title_trims(title: &str) -> Vec<String> {
    let words: Vec<&str> = title.split_whitespace().collect();
    (0..words.len())
        .map(|n| words[..words.len() - n].join(" "))
        .collect()
}

/// Build a record from a lookup entry, preferring synced lyrics. `None` when
/// the entry exposes no lyrics (and is not handled as instrumental upstream).
fn record_from_lookup(identity: &TrackIdentity, track: &LrclibTrack) -> Option<LyricsRecord> {
    let (synced, lyrics) = match (&track.synced_lyrics, &track.plain_lyrics) {
        (Some(synced), _) => (true, synced.clone()),
        (None, Some(plain)) => (false, plain.clone()),
        (None, None) => return None,
    };
    Some(LyricsRecord {
        identity: identity.clone(),
        synced,
        lyrics,
    })
}
