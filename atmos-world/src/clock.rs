//! World clocks.
//!
//! [`SystemClock`] follows the wall clock. [`ManualClock`] only moves when
//! told to, for tests and for hosts that run their own day cycle.

use chrono::{DateTime, Duration, Timelike, Utc};
use parking_lot::Mutex;

use atmos_core::types::WorldClock;

/// Wall-clock time, with the in-world hour offset from UTC.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock {
    hour_offset: i32,
}

impl SystemClock {
    /// A clock whose in-world hour is UTC shifted by `hour_offset`.
    #[must_use]
    pub fn with_offset(hour_offset: i32) -> Self {
        Self { hour_offset }
    }
}

impl WorldClock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn hour_of_day(&self) -> u32 {
        shifted_hour(Utc::now().hour(), self.hour_offset)
    }
}

/// A clock that only advances on request.
#[derive(Debug)]
pub struct ManualClock {
    inner: Mutex<ManualInner>,
}

#[derive(Debug)]
struct ManualInner {
    now: DateTime<Utc>,
    hour: Option<u32>,
}

impl ManualClock {
    /// Start at `start`; the hour follows `start` until pinned.
    #[must_use]
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            inner: Mutex::new(ManualInner { now: start, hour: None }),
        }
    }

    /// Move time forward (negative durations are ignored).
    pub fn advance(&self, by: Duration) {
        if by > Duration::zero() {
            self.inner.lock().now += by;
        }
    }

    /// Pin the in-world hour, independent of the timestamp.
    pub fn set_hour(&self, hour: u32) {
        self.inner.lock().hour = Some(hour % 24);
    }
}

impl WorldClock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        self.inner.lock().now
    }

    fn hour_of_day(&self) -> u32 {
        let inner = self.inner.lock();
        inner.hour.unwrap_or_else(|| inner.now.hour())
    }
}

fn shifted_hour(hour: u32, offset: i32) -> u32 {
    // rem_euclid keeps negative offsets in 0..24
    (i64::from(hour) + i64::from(offset)).rem_euclid(24) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn manual_clock_advances() {
        let start = Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).single().expect("valid date");
        let clock = ManualClock::new(start);
        assert_eq!(clock.hour_of_day(), 8);
        clock.advance(Duration::hours(3));
        assert_eq!(clock.now(), start + Duration::hours(3));
        assert_eq!(clock.hour_of_day(), 11);
        clock.advance(Duration::hours(-5));
        assert_eq!(clock.hour_of_day(), 11);
    }

    #[test]
    fn pinned_hour_wins() {
        let clock = ManualClock::new(Utc::now());
        clock.set_hour(26);
        assert_eq!(clock.hour_of_day(), 2);
    }

    #[test]
    fn offset_wraps() {
        assert_eq!(shifted_hour(1, -3), 22);
        assert_eq!(shifted_hour(22, 5), 3);
        assert!(SystemClock::with_offset(-30).hour_of_day() < 24);
    }
}
