use chrono::{Duration, NaiveDateTime};

/// Whether faces are currently being tracked, and since when.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Tracking { since: NaiveDateTime },
}

/// Debounces face presence across frames.
///
/// A face has to stay in view for the whole debounce period before its
/// frame is committed. Once the period has elapsed every further frame with
/// faces commits, until a frame without faces resets the session.
#[derive(Clone, Debug)]
pub struct DetectionSession {
    state: SessionState,
    debounce: Duration,
}

impl DetectionSession {
    pub fn new(debounce: Duration) -> Self {
        Self {
            state: SessionState::Idle,
            debounce,
        }
    }

    /// Builds a session from a fractional number of seconds.
    pub fn from_seconds(seconds: f64) -> Self {
        Self::new(Duration::milliseconds((seconds.max(0.0) * 1000.0).round() as i64))
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Feeds one frame's detection count observed at `now`.
    ///
    /// Returns `true` when the frame should be committed.
    pub fn observe(&mut self, now: NaiveDateTime, face_count: usize) -> bool {
        match (self.state, face_count) {
            (SessionState::Idle, 0) => false,
            (SessionState::Idle, _) => {
                self.state = SessionState::Tracking { since: now };
                false
            }
            (SessionState::Tracking { .. }, 0) => {
                self.state = SessionState::Idle;
                false
            }
            (SessionState::Tracking { since }, _) => now - since >= self.debounce,
        }
    }
}
