use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Duration, NaiveDate, Utc};

/// Clock abstracts access to the current timestamp so services remain deterministic in tests.
pub trait Clock: Send + Sync {
    /// Returns the current UTC timestamp.
    fn now(&self) -> DateTime<Utc>;

    /// Returns the current UTC date. Defaults to `now().date_naive()`.
    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

/// Real-time clock backed by the system UTC time source.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that advances by a fixed step on every `now()` call.
///
/// Each timestamp it hands out is strictly later than the previous one, which keeps
/// `createdAt` tie-breaks reproducible.
#[derive(Debug)]
pub struct SteppingClock {
    next: Mutex<DateTime<Utc>>,
    step: Duration,
}

impl SteppingClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self::with_step(start, Duration::seconds(1))
    }

    pub fn with_step(start: DateTime<Utc>, step: Duration) -> Self {
        Self {
            next: Mutex::new(start),
            step,
        }
    }

    /// Timestamp the next `now()` call will return.
    pub fn peek(&self) -> DateTime<Utc> {
        *self.next.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Clock for SteppingClock {
    fn now(&self) -> DateTime<Utc> {
        let mut next = self.next.lock().unwrap_or_else(PoisonError::into_inner);
        let current = *next;
        *next = current + self.step;
        current
    }

    fn today(&self) -> NaiveDate {
        self.peek().date_naive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn stepping_clock_is_strictly_increasing() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 23, 59, 59).unwrap();
        let clock = SteppingClock::new(start);

        assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        let first = clock.now();
        let second = clock.now();
        assert_eq!(first, start);
        assert!(second > first);
        assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
    }

    #[test]
    fn system_clock_today_matches_now() {
        let clock = SystemClock;
        let today = clock.today();
        let now = clock.now().date_naive();
        assert!(now >= today);
    }
}
