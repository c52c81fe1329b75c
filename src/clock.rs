//! Time sources driving deadline scheduling.
//!
//! A `Clock` is any zero-argument source of `Timestamp`s. Readings are assumed to be
//! monotonically non-decreasing; nothing here verifies it.
use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Instant,
};

use crate::scheduling::Timestamp;

/// Zero-argument time source.
pub trait Clock {
    type Instant: Timestamp;

    fn now(&self) -> Self::Instant;
}

impl<F, T> Clock for F
where
    F: Fn() -> T,
    T: Timestamp,
{
    type Instant = T;

    fn now(&self) -> T {
        self()
    }
}

/// Monotonic wall clock backed by `std::time::Instant`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    type Instant = Instant;

    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Integer clock that only moves when told to.
///
/// Clones share the same reading, so a test can hand one copy to a registry and keep
/// advancing the other.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    time: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new(start: u64) -> Self {
        Self {
            time: Arc::new(AtomicU64::new(start)),
        }
    }

    pub fn advance(&self, delta: u64) {
        self.time.fetch_add(delta, Ordering::AcqRel);
    }

    /// Jump to `time`. Moving backwards is allowed but breaks the monotonic assumption.
    pub fn set(&self, time: u64) {
        self.time.store(time, Ordering::Release);
    }
}

impl Clock for ManualClock {
    type Instant = u64;

    fn now(&self) -> u64 {
        self.time.load(Ordering::Acquire)
    }
}
