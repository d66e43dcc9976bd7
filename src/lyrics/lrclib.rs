//! lrclib.net lookup client: exact get-by-identity plus title search.

use crate::lyrics::resolve::LyricsProvider;
use crate::lyrics::types::{LyricsError, TrackIdentity, http_client};
use serde::{Deserialize, Deserializer};

const DEFAULT_BASE_URL: &str = "https://lrclib.net";

/// One track entry as returned by both lrclib endpoints. The search endpoint
/// carries `artistName`; the exact endpoint omits it.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LrclibTrack {
    #[serde(default)]
    pub artist_name: Option<String>,
    #[serde(default, deserialize_with = "boolish")]
    pub instrumental: bool,
    #[serde(default)]
    pub synced_lyrics: Option<String>,
    #[serde(default)]
    pub plain_lyrics: Option<String>,
}

impl LrclibTrack {
    pub fn has_lyrics(&self) -> bool {
        self.synced_lyrics.is_some() || self.plain_lyrics.is_some()
    }
}

// The API has served `instrumental` both as a JSON bool and as the string
// "True"; accept either.
fn boolish<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    struct BoolishVisitor;

    impl serde::de::Visitor<'_> for BoolishVisitor {
        type Value = bool;

        fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
            f.write_str("a boolean or a boolean-like string")
        }

        fn visit_bool<E: serde::de::Error>(self, v: bool) -> Result<bool, E> {
            Ok(v)
        }

        fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<bool, E> {
            Ok(v.eq_ignore_ascii_case("true"))
        }

        fn visit_unit<E: serde::de::Error>(self) -> Result<bool, E> {
            Ok(false)
        }
    }

    deserializer.deserialize_any(BoolishVisitor)
}

/// HTTP client for the lrclib lookup API. The base URL is overridable so
/// tests can point at a local server.
#[derive(Debug, Clone)]
pub struct LrclibClient {
    base_url: String,
}

impl Default for LrclibClient {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

impl LrclibClient {
    #[cfg(test)]
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }

    fn exact_url(&self, identity: &TrackIdentity) -> String {
        format!(
            "{}/api/get?track_name={}&artist_name={}&album_name={}&duration={}",
            self.base_url,
            urlencoding::encode(&identity.title),
            urlencoding::encode(&identity.artist),
            urlencoding::encode(&identity.album),
            identity.duration_secs,
        )
    }

    fn search_url(&self, track_name: &str) -> String {
        format!(
            "{}/api/search?track_name={}",
            self.base_url,
            urlencoding::encode(track_name),
        )
    }
}

impl LyricsProvider for LrclibClient {
    /// Query `/api/get` with all four identity fields. A 404 means
    /// not-found, which is a regular outcome rather than an error.
    async fn get_exact(
        &self,
        identity: &TrackIdentity,
    ) -> Result<Option<LrclibTrack>, LyricsError> {
        let resp = http_client().get(self.exact_url(identity)).send().await?;
        if resp.status().as_u16() == 404 {
            return Ok(None);
        }
        if !resp.status().is_success() {
            return Err(LyricsError::Api(format!(
                "lrclib get: HTTP {}",
                resp.status()
            )));
        }
        Ok(Some(resp.json().await?))
    }

    /// Query `/api/search` with a (possibly trimmed) title.
    async fn search(&self, track_name: &str) -> Result<Vec<LrclibTrack>, LyricsError> {
        let resp = http_client().get(self.search_url(track_name)).send().await?;
        if !resp.status().is_success() {
            return Err(LyricsError::Api(format!(
                "lrclib search: HTTP {}",
                resp.status()
            )));
        }
        Ok(resp.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_url_encodes_all_four_fields() {
        let client = LrclibClient::with_base_url("http://localhost:8080");
        let identity = TrackIdentity {
            title: "Song & Dance".into(),
            artist: "A Band".into(),
            album: "Ü".into(),
            duration_secs: 200,
        };
        assert_eq!(
            client.exact_url(&identity),
            "http://localhost:8080/api/get?track_name=Song%20%26%20Dance\
             &artist_name=A%20Band&album_name=%C3%9C&duration=200"
        );
    }

    #[test]
    fn search_url_encodes_track_name() {
        let client = LrclibClient::with_base_url("http://localhost:8080");
        assert_eq!(
            client.search_url("a b"),
            "http://localhost:8080/api/search?track_name=a%20b"
        );
    }

    #[test]
    fn instrumental_accepts_bool_and_string_forms() {
        let t: LrclibTrack = serde_json::from_str(r#"{"instrumental": true}"#).unwrap();
        assert!(t.instrumental);
        let t: LrclibTrack = serde_json::from_str(r#"{"instrumental": "True"}"#).unwrap();
        assert!(t.instrumental);
        let t: LrclibTrack = serde_json::from_str(r#"{"instrumental": "False"}"#).unwrap();
        assert!(!t.instrumental);
        let t: LrclibTrack = serde_json::from_str(r#"{"instrumental": null}"#).unwrap();
        assert!(!t.instrumental);
        let t: LrclibTrack = serde_json::from_str("{}").unwrap();
        assert!(!t.instrumental);
    }

    #[test]
    fn null_lyrics_fields_deserialize_to_none() {
        let t: LrclibTrack = serde_json::from_str(
            r#"{"artistName":"Someone","syncedLyrics":null,"plainLyrics":"words"}"#,
        )
        .unwrap();
        assert_eq!(t.artist_name.as_deref(), Some("Someone"));
        assert!(t.synced_lyrics.is_none());
        assert_eq!(t.plain_lyrics.as_deref(), Some("words"));
        assert!(t.has_lyrics());
    }
}
