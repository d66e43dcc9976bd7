// lyrics/mod.rs - top-level lyrics module re-exporting submodules
pub mod cache;
pub mod lrclib;
pub mod parse;
pub mod resolve;
pub mod types;

pub use cache::LyricsCache;
pub use lrclib::LrclibClient;
pub use parse::parse_timed_lines;
pub use resolve::{LyricsProvider, resolve};
pub use types::{LyricsError, LyricsRecord, TimedLine, TrackIdentity};
