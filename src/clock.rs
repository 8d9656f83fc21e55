//! Clock abstraction used for daily order expiry.
//!
//! Orders expire at the next local midnight. The store adapter and the
//! in-memory backend both read time through [`Clock`] so tests can move
//! time forward without sleeping.

use chrono::{DateTime, Duration, Local, NaiveDate, NaiveDateTime, TimeZone};
use std::sync::Mutex;

/// Source of the current local time
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Local>;
}

/// Wall clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// Clock that only moves when told to
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Local>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Local>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn set(&self, time: DateTime<Local>) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = time;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Local> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// First instant of the day after `now`, in local time.
///
/// When local midnight falls in a DST gap the day starts at its first
/// valid hour instead (01:00 for a gap starting at midnight).
pub fn next_local_midnight(now: DateTime<Local>) -> DateTime<Local> {
    now.date_naive()
        .succ_opt()
        .and_then(|tomorrow| {
            first_valid_hour(tomorrow, |t| Local.from_local_datetime(&t).earliest())
        })
        .unwrap_or_else(|| now + Duration::hours(24))
}

/// Resolve the hours of `day` in order and return the first that exists
fn first_valid_hour<T>(day: NaiveDate, resolve: impl Fn(NaiveDateTime) -> Option<T>) -> Option<T> {
    (0..24)
        .filter_map(|hour| day.and_hms_opt(hour, 0, 0))
        .find_map(resolve)
}
