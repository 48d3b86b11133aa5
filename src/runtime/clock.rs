use std::sync::Mutex;

use chrono::{DateTime, Utc};

/// Source of "now" for ingestion stamps and purge ticks.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to. Used for replays and tests.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, by: chrono::Duration) {
        let mut guard = self.now.lock().expect("manual clock mutex poisoned");
        *guard += by;
    }

    /// Step forward by `millis`. Returns the new time, or `None` (leaving the
    /// clock where it was) when the step does not fit a timestamp.
    pub fn try_advance_millis(&self, millis: u64) -> Option<DateTime<Utc>> {
        let step = i64::try_from(millis)
            .ok()
            .and_then(chrono::Duration::try_milliseconds)?;
        let mut guard = self.now.lock().expect("manual clock mutex poisoned");
        let next = guard.checked_add_signed(step)?;
        *guard = next;
        Some(next)
    }

    pub fn set(&self, at: DateTime<Utc>) {
        *self.now.lock().expect("manual clock mutex poisoned") = at;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().expect("manual clock mutex poisoned")
    }
}
