use chrono::{DateTime, Duration, Utc};

/// Inactivity gap after which the displayed speed is forced to zero even
/// though the averaging window is still open.
pub const FRESHNESS_WINDOW_MS: i64 = 2_000;

/// Live typing-window state. One instance per collection session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    pub start_time: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub keystroke_count: u64,
    pub current_wpm: u32,
    pub collecting: bool,
}

impl SessionState {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            start_time: now,
            last_activity: now,
            keystroke_count: 0,
            current_wpm: 0,
            collecting: false,
        }
    }
}

/// Words-per-minute calculator over a rolling activity window.
///
/// The window restarts whenever the idle threshold elapses between two
/// activity events; the estimate reads zero whenever the freshness window
/// has elapsed since the latest activity.
#[derive(Debug)]
pub struct SpeedEstimator {
    pub state: SessionState,
    idle_threshold: Duration,
}

impl SpeedEstimator {
    pub fn new(idle_threshold_secs: u64, now: DateTime<Utc>) -> Self {
        Self {
            state: SessionState::new(now),
            idle_threshold: Duration::seconds(idle_threshold_secs as i64),
        }
    }

    /// Record typed characters at `now`. Returns true when the idle gap had
    /// expired and the window restarted before this activity was applied.
    pub fn on_activity(&mut self, chars: u64, now: DateTime<Utc>) -> bool {
        let expired = now - self.state.last_activity > self.idle_threshold;
        if expired {
            self.state.start_time = now;
            self.state.keystroke_count = 0;
        }
        self.state.keystroke_count += chars;
        self.state.last_activity = now;
        expired
    }

    /// Recompute and store the current estimate. Idempotent for a fixed
    /// `now`: repeated evaluation never compounds.
    pub fn evaluate(&mut self, now: DateTime<Utc>) -> u32 {
        let wpm = self.wpm_at(now);
        self.state.current_wpm = wpm;
        wpm
    }

    fn wpm_at(&self, now: DateTime<Utc>) -> u32 {
        if (now - self.state.last_activity).num_milliseconds() >= FRESHNESS_WINDOW_MS {
            return 0;
        }
        let elapsed_ms = (now - self.state.start_time).num_milliseconds();
        if elapsed_ms <= 0 {
            return 0;
        }
        let words = self.state.keystroke_count as f64 / 5.0;
        let minutes = elapsed_ms as f64 / 60_000.0;
        (words / minutes).round() as u32
    }

    /// Start a fresh window: keystrokes and the displayed estimate reset,
    /// the last-activity mark is left alone.
    pub fn reset_window(&mut self, now: DateTime<Utc>) {
        self.state.start_time = now;
        self.state.keystroke_count = 0;
        self.state.current_wpm = 0;
    }
}
