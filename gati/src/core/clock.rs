//! Monotonic time sources.
//!
//! All reading timestamps and the engine's session epoch share one clock
//! domain: signed microseconds since the clock's origin.

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{Duration, Instant};

/// Monotonic clock in microseconds
pub trait Clock: Send + Sync {
    /// Current time in microseconds since the clock origin
    fn now_us(&self) -> i64;
}

/// Wall-clock-free monotonic clock backed by [`Instant`]
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    /// Create a clock whose origin is "now"
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_us(&self) -> i64 {
        i64::try_from(self.origin.elapsed().as_micros()).unwrap_or(i64::MAX)
    }
}

/// Manually advanced clock for replay and tests
#[derive(Debug, Default)]
pub struct ManualClock {
    now_us: AtomicI64,
}

impl ManualClock {
    /// Create a manual clock at `start_us`
    pub fn new(start_us: i64) -> Self {
        Self {
            now_us: AtomicI64::new(start_us),
        }
    }

    /// Jump to an absolute time
    pub fn set_us(&self, now_us: i64) {
        self.now_us.store(now_us, Ordering::Release);
    }

    /// Advance by `dt`, returning the new time
    pub fn advance(&self, dt: Duration) -> i64 {
        let dt_us = i64::try_from(dt.as_micros()).unwrap_or(i64::MAX);
        self.now_us.fetch_add(dt_us, Ordering::AcqRel) + dt_us
    }
}

impl Clock for ManualClock {
    fn now_us(&self) -> i64 {
        self.now_us.load(Ordering::Acquire)
    }
}
