//! The monotonic-enough wall clock seam (§4.G).
//!
//! Both `time_added`/`time_updated` stamping on ingest and the janitor's
//! aging comparisons go through a [`Clock`], so tests can drive eviction
//! deterministically instead of sleeping for `MIN_FLOW_AGE` seconds.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Seconds since the epoch, host clock units.
pub trait Clock: Send + Sync {
    fn now_secs(&self) -> u64;
}

/// The real wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_secs(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock is before the epoch")
            .as_secs()
    }
}

/// A clock that only advances when told to. Used by janitor and scenario
/// tests so `MIN_FLOW_AGE`/`MAX_FLOW_AGE` boundaries can be crossed without
/// real sleeping.
#[derive(Debug, Default)]
pub struct FakeClock {
    now: AtomicU64,
}

impl FakeClock {
    pub fn new(start: u64) -> Self {
        Self {
            now: AtomicU64::new(start),
        }
    }

    pub fn advance(&self, secs: u64) {
        self.now.fetch_add(secs, Ordering::SeqCst);
    }

    pub fn set(&self, value: u64) {
        self.now.store(value, Ordering::SeqCst);
    }
}

impl Clock for FakeClock {
    fn now_secs(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}
