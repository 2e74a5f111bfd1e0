use chrono::{Local, NaiveDateTime};

/// Source of "now" for time-sensitive rules (the future-start check in
/// booking). All scheduling runs on a single server-local clock, so the
/// trait hands out naive local timestamps.
pub trait Clock: Send + Sync {
    fn now_local(&self) -> NaiveDateTime;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now_local(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Frozen clock for tests.
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now_local(&self) -> NaiveDateTime {
        self.0
    }
}
