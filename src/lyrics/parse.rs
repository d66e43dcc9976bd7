use crate::lyrics::types::{LyricsError, TimedLine};
use once_cell::sync::Lazy;
use regex::Regex;

static TIMESTAMP_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\[(\d{2}):(\d{2}\.\d{1,2})\]$").unwrap());

/// Parse line-tagged lyrics (`[MM:SS.xx] text` per line) into timed lines.
///
/// Lines keep their source order; lrclib serves them already sorted, so no
/// re-sort happens here. Any line that cannot be split into a timestamp
/// token and text, or whose timestamp fields are not numeric, is a hard
/// `Format` error: a malformed source must abort the synchronized display
/// rather than show corrupted timing. Blank lines carry no timing and are
/// skipped.
pub fn parse_timed_lines(raw: &str) -> Result<Vec<TimedLine>, LyricsError> {
    let mut lines = Vec::new();
    for line in raw.lines() {
        if line.trim().is_empty() {
            continue;
        }
        let (stamp, text) = line
            .split_once(' ')
            .ok_or_else(|| LyricsError::Format(line.to_string()))?;
        let caps = TIMESTAMP_RE
            .captures(stamp)
            .ok_or_else(|| LyricsError::Format(line.to_string()))?;
        let minutes: u64 = caps[1]
            .parse()
            .map_err(|_| LyricsError::Format(line.to_string()))?;
        let seconds: f64 = caps[2]
            .parse()
            .map_err(|_| LyricsError::Format(line.to_string()))?;
        let offset_ms = ((minutes * 60) as f64 + seconds) * 1000.0;
        lines.push(TimedLine {
            offset_ms: offset_ms.round() as u64,
            text: text.to_string(),
        });
    }
    Ok(lines)
}
