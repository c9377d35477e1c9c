//! Time abstraction so scheduling, TTL caches, and rolling windows are
//! deterministically testable without sleeping real time.

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Utc};

/// Source of the current time. Injected everywhere a module needs "now"
/// instead of calling `Utc::now()` directly.
pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> DateTime<Utc>;

    fn now_unix_secs(&self) -> i64 {
        self.now().timestamp()
    }
}

/// Wall-clock time, used by the long-running node binary.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A manually-advanced clock for unit and integration tests. Starts at the
/// Unix epoch unless constructed with [`FixedClock::at`].
#[derive(Debug)]
pub struct FixedClock {
    unix_secs: AtomicI64,
}

impl FixedClock {
    pub fn at(unix_secs: i64) -> Self {
        Self {
            unix_secs: AtomicI64::new(unix_secs),
        }
    }

    pub fn advance(&self, secs: i64) {
        self.unix_secs.fetch_add(secs, Ordering::SeqCst);
    }

    pub fn set(&self, unix_secs: i64) {
        self.unix_secs.store(unix_secs, Ordering::SeqCst);
    }
}

impl Default for FixedClock {
    fn default() -> Self {
        Self::at(0)
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.unix_secs.load(Ordering::SeqCst), 0)
            .expect("fixed clock holds a valid timestamp")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_clock_advances() {
        let clock = FixedClock::at(1_000);
        assert_eq!(clock.now_unix_secs(), 1_000);
        clock.advance(60);
        assert_eq!(clock.now_unix_secs(), 1_060);
    }

    #[test]
    fn fixed_clock_can_be_set() {
        let clock = FixedClock::default();
        clock.set(42);
        assert_eq!(clock.now_unix_secs(), 42);
    }
}
