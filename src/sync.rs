//! Playback synchronization loop: emits each timed line exactly once as
//! the polled position crosses it, and cancels on track change.

use crate::lyrics::{TimedLine, TrackIdentity};
use crate::mpris::MprisError;
use std::time::Duration;

/// Forward bias added to the polled position when deciding a line is due,
/// compensating for display and polling latency.
pub const LOOKAHEAD_MS: u64 = 600;

/// How the player is observed by the loop. Implemented by the MPRIS handle
/// and by scripted fakes in tests.
#[allow(async_fn_in_trait)]
pub trait PlaybackSource {
    async fn position_ms(&self) -> Result<u64, MprisError>;
    async fn current_title(&self) -> Result<String, MprisError>;
}

#[derive(Debug, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Position passed the track duration.
    Finished,
    /// The playing title no longer matches the resolved identity.
    TrackChanged,
}

/// Drive a timed line sequence against live playback position.
///
/// Each wake-up re-checks the cancellation condition first, so a track
/// change aborts within one poll interval without emitting further lines.
/// Before the first line's offset the loop idles; after the last emission
/// it idles until position reaches the track duration. Players that report
/// no duration can only end the loop via track change.
pub async fn run_synced(
    player: &impl PlaybackSource,
    identity: &TrackIdentity,
    lines: &[TimedLine],
    poll_interval: Duration,
    emit: &mut impl FnMut(&str),
) -> Result<SyncOutcome, MprisError> {
    let duration_ms = identity.duration_secs.max(0) as u64 * 1000;
    let mut shown = vec![false; lines.len()];
    loop {
        if player.current_title().await? != identity.title {
            return Ok(SyncOutcome::TrackChanged);
        }
        let position = player.position_ms().await?;
        if let Some(n) = due_line(lines, position + LOOKAHEAD_MS)
            && !shown[n]
        {
            emit(&lines[n].text);
            shown[n] = true;
        }
        if duration_ms > 0 && position >= duration_ms {
            return Ok(SyncOutcome::Finished);
        }
        tokio::time::sleep(poll_interval).await;
    }
}

/// Emit unsynced (or instrumental) lyrics once, then idle until the track
/// changes.
pub async fn run_unsynced(
    player: &impl PlaybackSource,
    identity: &TrackIdentity,
    text: &str,
    poll_interval: Duration,
    emit: &mut impl FnMut(&str),
) -> Result<SyncOutcome, MprisError> {
    emit(text);
    wait_for_track_change(player, identity, poll_interval).await?;
    Ok(SyncOutcome::TrackChanged)
}

/// Idle-poll until the playing title differs from `identity`.
pub async fn wait_for_track_change(
    player: &impl PlaybackSource,
    identity: &TrackIdentity,
    poll_interval: Duration,
) -> Result<(), MprisError> {
    while player.current_title().await? == identity.title {
        tokio::time::sleep(poll_interval).await;
    }
    Ok(())
}

/// Index of the line due at the biased position: the last line whose offset
/// has been reached, `None` before the first one.
fn due_line(lines: &[TimedLine], biased_position: u64) -> Option<usize> {
    lines
        .partition_point(|line| line.offset_ms <= biased_position)
        .checked_sub(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    fn lines() -> Vec<TimedLine> {
        [(0, "a"), (1000, "b"), (2000, "c")]
            .into_iter()
            .map(|(offset_ms, text)| TimedLine {
                offset_ms,
                text: text.to_string(),
            })
            .collect()
    }

    fn identity(duration_secs: i64) -> TrackIdentity {
        TrackIdentity {
            title: "T".into(),
            artist: "A".into(),
            album: "L".into(),
            duration_secs,
        }
    }

    /// Replays scripted positions and titles; the last value of each script
    /// repeats once exhausted.
    struct FakeSource {
        positions: Mutex<VecDeque<u64>>,
        titles: Mutex<VecDeque<String>>,
    }

    impl FakeSource {
        fn new(positions: &[u64], titles: &[&str]) -> Self {
            Self {
                positions: Mutex::new(positions.iter().copied().collect()),
                titles: Mutex::new(titles.iter().map(|t| t.to_string()).collect()),
            }
        }
    }

    fn next_or_last<T: Clone>(queue: &Mutex<VecDeque<T>>) -> T {
        let mut queue = queue.lock().unwrap();
        if queue.len() > 1 {
            queue.pop_front().unwrap()
        } else {
            queue.front().cloned().unwrap()
        }
    }

    impl PlaybackSource for FakeSource {
        async fn position_ms(&self) -> Result<u64, MprisError> {
            Ok(next_or_last(&self.positions))
        }

        async fn current_title(&self) -> Result<String, MprisError> {
            Ok(next_or_last(&self.titles))
        }
    }

    #[tokio::test]
    async fn emits_each_due_line_exactly_once() {
        let source = FakeSource::new(&[0, 100, 500, 700, 1500, 2500, 3000], &["T"]);
        let mut emitted = Vec::new();
        let outcome = run_synced(
            &source,
            &identity(3),
            &lines(),
            Duration::from_millis(1),
            &mut |text| emitted.push(text.to_string()),
        )
        .await
        .unwrap();
        assert_eq!(outcome, SyncOutcome::Finished);
        // Position 500 + 600ms lookahead crosses line "b"; repeated polls
        // inside the same window must not re-emit it.
        assert_eq!(emitted, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn track_change_aborts_without_further_lines() {
        let source = FakeSource::new(&[0, 100, 200], &["T", "T", "other"]);
        let mut emitted = Vec::new();
        let outcome = run_synced(
            &source,
            &identity(3),
            &lines(),
            Duration::from_millis(1),
            &mut |text| emitted.push(text.to_string()),
        )
        .await
        .unwrap();
        assert_eq!(outcome, SyncOutcome::TrackChanged);
        assert_eq!(emitted, vec!["a"]);
    }

    #[tokio::test]
    async fn idles_before_the_first_line() {
        let late = vec![TimedLine {
            offset_ms: 5000,
            text: "late".into(),
        }];
        let source = FakeSource::new(&[0, 100, 200], &["T", "T", "T", "other"]);
        let mut emitted = Vec::new();
        let outcome = run_synced(
            &source,
            &identity(10),
            &late,
            Duration::from_millis(1),
            &mut |text| emitted.push(text.to_string()),
        )
        .await
        .unwrap();
        assert_eq!(outcome, SyncOutcome::TrackChanged);
        assert!(emitted.is_empty());
    }

    #[tokio::test]
    async fn missing_duration_waits_for_track_change() {
        let source = FakeSource::new(&[9_000_000], &["T", "T", "other"]);
        let mut emitted = Vec::new();
        let outcome = run_synced(
            &source,
            &identity(0),
            &lines(),
            Duration::from_millis(1),
            &mut |text| emitted.push(text.to_string()),
        )
        .await
        .unwrap();
        assert_eq!(outcome, SyncOutcome::TrackChanged);
    }

    #[tokio::test]
    async fn unsynced_text_is_emitted_once_then_waits() {
        let source = FakeSource::new(&[0], &["T", "T", "other"]);
        let mut emitted = Vec::new();
        let outcome = run_unsynced(
            &source,
            &identity(100),
            "whole text",
            Duration::from_millis(1),
            &mut |text| emitted.push(text.to_string()),
        )
        .await
        .unwrap();
        assert_eq!(outcome, SyncOutcome::TrackChanged);
        assert_eq!(emitted, vec!["whole text"]);
    }

    #[test]
    fn due_line_window_boundaries() {
        let lines = lines();
        assert_eq!(due_line(&lines, 0), Some(0));
        assert_eq!(due_line(&lines, 999), Some(0));
        assert_eq!(due_line(&lines, 1000), Some(1));
        assert_eq!(due_line(&lines, 5000), Some(2));
        let late = [TimedLine {
            offset_ms: 100,
            text: "x".into(),
        }];
        assert_eq!(due_line(&late, 99), None);
        assert_eq!(due_line(&[], 1000), None);
    }
}
