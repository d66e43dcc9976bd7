use once_cell::sync::Lazy;
use reqwest::Client;
use thiserror::Error;

/// Sentinel lyrics text stored for instrumental tracks.
pub const INSTRUMENTAL: &str = "instrumental";

// Shared HTTP client with a bounded timeout so a stalled lookup can never
// freeze the polling loop.
static HTTP_CLIENT: Lazy<Client> = Lazy::new(|| {
    Client::builder()
        .user_agent("lyricfollow/0.1")
        .timeout(std::time::Duration::from_secs(10))
        .build()
        .expect("failed to build HTTP client")
});

pub(crate) fn http_client() -> &'static Client {
    &HTTP_CLIENT
}

/// The four-field key identifying a song for caching and lookup.
/// Equality is exact and case-sensitive on all fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackIdentity {
    pub title: String,
    pub artist: String,
    pub album: String,
    pub duration_secs: i64,
}

/// A resolved lyrics record. `lyrics` holds raw line-tagged text when
/// `synced` is true, plain text otherwise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LyricsRecord {
    pub identity: TrackIdentity,
    pub synced: bool,
    pub lyrics: String,
}

impl LyricsRecord {
    /// Synthesize the record stored for instrumental tracks.
    pub fn instrumental(identity: TrackIdentity) -> Self {
        Self {
            identity,
            synced: false,
            lyrics: INSTRUMENTAL.to_string(),
        }
    }

    pub fn is_instrumental(&self) -> bool {
        !self.synced && self.lyrics == INSTRUMENTAL
    }
}

/// One lyric line with its display offset from playback start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimedLine {
    pub offset_ms: u64,
    pub text: String,
}

#[derive(Error, Debug)]
pub enum LyricsError {
    #[error("malformed timestamp line: {0:?}")]
    Format(String),
    #[error("no lyrics found")]
    NotFound,
    #[error("lyrics store error: {0}")]
    Store(#[from] sqlx::Error),
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("lookup API error: {0}")]
    Api(String),
}
