use std::sync::{Arc, Mutex};

use chrono::{Duration, Local, NaiveDateTime, SubsecRound};

/// Source of local wall-clock time.
///
/// Rotation and debouncing both depend on the time of day, so the store
/// and the capture loop read time through this trait instead of calling
/// `Local::now()` directly.
pub trait Clock: Send {
    fn now(&self) -> NaiveDateTime;
}

/// The machine's local time.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// A clock that only moves when told to. Clones share the same time.
#[derive(Clone, Debug)]
pub struct ManualClock {
    now: Arc<Mutex<NaiveDateTime>>,
}

impl ManualClock {
    pub fn new(start: NaiveDateTime) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    pub fn set(&self, time: NaiveDateTime) {
        *self.now.lock().unwrap() = time;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap();
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> NaiveDateTime {
        *self.now.lock().unwrap()
    }
}

/// Drops sub-second precision; records are logged at second resolution.
pub fn to_seconds(time: NaiveDateTime) -> NaiveDateTime {
    time.trunc_subsecs(0)
}
