//! Hour bucketing and the time source behind it.

use chrono::{DateTime, DurationRound, SecondsFormat, Utc};
use parking_lot::Mutex;

/// Source of "now" for the recorder, flusher and query.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Settable clock for tests and replays.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock() = now;
    }

    pub fn advance(&self, by: chrono::Duration) {
        let mut now = self.now.lock();
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

/// Truncate to the start of the hour.
pub fn hour_floor(at: DateTime<Utc>) -> DateTime<Utc> {
    // Only fails for timestamps outside chrono's representable range.
    at.duration_trunc(chrono::Duration::hours(1)).unwrap_or(at)
}

/// Storage key of an hour bucket: ISO-8601 with millisecond precision,
/// e.g. `2024-01-01T13:00:00.000Z`. Lexicographic order equals time order.
pub fn hour_key(hour: DateTime<Utc>) -> String {
    hour.to_rfc3339_opts(SecondsFormat::Millis, true)
}
