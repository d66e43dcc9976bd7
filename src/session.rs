//! One session per discovered player: resolves lyrics for whatever is
//! playing and drives the display loop, track after track.

use crate::lyrics::{self, LrclibClient, LyricsCache, LyricsError, LyricsRecord, TrackIdentity};
use crate::mpris::{MprisError, Player};
use crate::sync;
use std::time::Duration;

const SEPARATOR: &str = "-------------------------------------------------";

pub struct Session<'a> {
    player: Player,
    cache: Option<&'a LyricsCache>,
    client: LrclibClient,
    poll_interval: Duration,
}

impl<'a> Session<'a> {
    pub fn new(player: Player, cache: Option<&'a LyricsCache>, poll_interval: Duration) -> Self {
        Self {
            player,
            cache,
            client: LrclibClient::default(),
            poll_interval,
        }
    }

    /// Follow the player until a D-Bus error ends the session (the caller
    /// then re-enters discovery). Lookup failures are per-track: reported,
    /// then idled past.
    pub async fn run(&self) -> Result<(), MprisError> {
        loop {
            let identity = self.player.identity().await?;
            if identity.title.is_empty() {
                tokio::time::sleep(self.poll_interval).await;
                continue;
            }
            tracing::debug!(title = %identity.title, artist = %identity.artist, "looking up lyrics");
            match lyrics::resolve(self.cache, &self.client, &identity).await {
                Ok(record) => self.display(&record).await?,
                Err(LyricsError::NotFound) => {
                    println!("\n__________ Lyrics not found __________\n");
                    sync::wait_for_track_change(&self.player, &identity, self.poll_interval)
                        .await?;
                }
                Err(e) => {
                    tracing::warn!(error = %e, title = %identity.title, "lyrics lookup failed");
                    sync::wait_for_track_change(&self.player, &identity, self.poll_interval)
                        .await?;
                }
            }
        }
    }

    async fn display(&self, record: &LyricsRecord) -> Result<(), MprisError> {
        let identity = &record.identity;
        println!(
            "\n============ {} - {} ============\n",
            identity.title, identity.artist
        );

        if !record.synced {
            sync::run_unsynced(
                &self.player,
                identity,
                &record.lyrics,
                self.poll_interval,
                &mut |text| println!("{text}"),
            )
            .await?;
            println!("{SEPARATOR}");
            return Ok(());
        }

        let lines = match lyrics::parse_timed_lines(&record.lyrics) {
            Ok(lines) => lines,
            Err(e) => {
                // Showing garbled timing is worse than showing nothing.
                tracing::error!(error = %e, title = %identity.title, "unusable synced lyrics, skipping display");
                return self.idle_past(identity).await;
            }
        };
        if lines.is_empty() {
            return self.idle_past(identity).await;
        }

        sync::run_synced(
            &self.player,
            identity,
            &lines,
            self.poll_interval,
            &mut |text| println!("> {text}"),
        )
        .await?;
        println!("{SEPARATOR}");
        Ok(())
    }

    async fn idle_past(&self, identity: &TrackIdentity) -> Result<(), MprisError> {
        sync::wait_for_track_change(&self.player, identity, self.poll_interval).await
    }
}
