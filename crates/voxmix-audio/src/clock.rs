//! Millisecond wall clock used for elapsed-time bookkeeping.

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Instant;

/// Source of wall-clock milliseconds. Values wrap at `u32::MAX`.
pub trait Clock: Send + Sync {
    fn millis(&self) -> u32;
}

/// Monotonic clock counting from its construction.
#[derive(Debug)]
pub struct SystemClock {
    start: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn millis(&self) -> u32 {
        self.start.elapsed().as_millis() as u32
    }
}

/// Clock that only moves when told to. Used by tests.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU32,
}

impl ManualClock {
    pub fn new(start: u32) -> Self {
        Self {
            now: AtomicU32::new(start),
        }
    }

    pub fn set(&self, millis: u32) {
        self.now.store(millis, Ordering::Release);
    }

    pub fn advance(&self, millis: u32) {
        self.now.fetch_add(millis, Ordering::AcqRel);
    }
}

impl Clock for ManualClock {
    fn millis(&self) -> u32 {
        self.now.load(Ordering::Acquire)
    }
}
