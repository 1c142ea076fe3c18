//! Calendar source for expiration checks.
//!
//! Expiration is date-only and uses the service's local calendar, so the
//! registry asks a [`Clock`] for "today" instead of reading the system time
//! directly.

use chrono::NaiveDate;

/// Supplies the current calendar date.
pub trait Clock: Send + Sync + std::fmt::Debug {
    fn today(&self) -> NaiveDate;
}

/// The service's local calendar date.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        chrono::Local::now().date_naive()
    }
}

/// A clock pinned to one date.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_clock_returns_its_date() {
        let d = NaiveDate::from_ymd_opt(2025, 3, 14).unwrap();
        assert_eq!(FixedClock(d).today(), d);
    }

    #[test]
    fn system_clock_is_local_date() {
        let before = chrono::Local::now().date_naive();
        let today = SystemClock.today();
        let after = chrono::Local::now().date_naive();
        assert!(before <= today && today <= after);
    }
}
