//! Pluggable time source for the mock server.
//!
//! Candle synthesis and rate limiting both read the clock, so tests inject
//! a [`FakeClock`] to make them deterministic.

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// A source of "now" in Unix seconds / milliseconds.
pub trait Clock: Send + Sync {
    /// Seconds since the Unix epoch.
    fn now_secs(&self) -> i64;

    /// Milliseconds since the Unix epoch.
    fn now_millis(&self) -> i64 {
        self.now_secs() * 1000
    }
}

/// The real wall clock.
#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_secs(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or_default()
    }

    fn now_millis(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or_default()
    }
}

/// A manually-advanced clock for deterministic tests.
#[derive(Debug)]
pub struct FakeClock {
    now_secs: AtomicI64,
}

impl FakeClock {
    /// Create a fake clock frozen at `now_secs`.
    pub fn new(now_secs: i64) -> Self {
        Self {
            now_secs: AtomicI64::new(now_secs),
        }
    }

    /// Jump the clock to an absolute time.
    pub fn set(&self, now_secs: i64) {
        self.now_secs.store(now_secs, Ordering::SeqCst);
    }

    /// Advance the clock by `secs`.
    pub fn advance(&self, secs: i64) {
        self.now_secs.fetch_add(secs, Ordering::SeqCst);
    }
}

impl Clock for FakeClock {
    fn now_secs(&self) -> i64 {
        self.now_secs.load(Ordering::SeqCst)
    }
}
