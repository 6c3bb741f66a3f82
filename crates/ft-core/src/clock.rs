//! Wall-clock time sources.
//!
//! Every component of the engine reads time through a [`Clock`] so tests can
//! drive transitions with a [`ManualClock`] instead of sleeping.

use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Duration, SubsecRound, Utc};

/// Supplies the current wall-clock time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// The host clock, truncated to millisecond precision.
///
/// Persisted timestamps only carry milliseconds, so truncating here keeps the
/// in-memory and reloaded values identical.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now().trunc_subsecs(3)
    }
}

/// A clock that only moves when told to.
///
/// Clones share the same underlying instant.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    /// Moves the clock to an absolute instant.
    pub fn set(&self, instant: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner) = instant;
    }

    /// Moves the clock forward (or backward, for negative values) by `ms` milliseconds.
    pub fn advance_ms(&self, ms: i64) {
        let mut guard = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *guard += Duration::milliseconds(ms);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Milliseconds from `from` to `to`, negative if `to` is earlier.
pub fn millis_between(from: DateTime<Utc>, to: DateTime<Utc>) -> i64 {
    (to - from).num_milliseconds()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn epoch() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-01-01T09:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn manual_clock_advances_shared_instant() {
        let clock = ManualClock::new(epoch());
        let other = clock.clone();

        clock.advance_ms(1_500);

        assert_eq!(other.now(), epoch() + Duration::milliseconds(1_500));
    }

    #[test]
    fn manual_clock_set_overrides_instant() {
        let clock = ManualClock::new(epoch());
        let later = epoch() + Duration::hours(2);
        clock.set(later);
        assert_eq!(clock.now(), later);
    }

    #[test]
    fn system_clock_has_millisecond_precision() {
        let now = SystemClock.now();
        assert_eq!(now.timestamp_subsec_nanos() % 1_000_000, 0);
    }

    #[test]
    fn millis_between_is_signed() {
        let later = epoch() + Duration::seconds(3);
        assert_eq!(millis_between(epoch(), later), 3_000);
        assert_eq!(millis_between(later, epoch()), -3_000);
    }
}
