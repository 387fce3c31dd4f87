//! Time management for sensor nodes
//!
//! The node only ever needs a monotonic millisecond tick: for window spacing,
//! dwell timing, the starvation guard, and the timestamp embedded in each
//! packet. Wall-clock time is never required.

use core::cell::Cell;

pub use crate::traits::TimeSource;

/// Timestamp in milliseconds since device boot
pub type Timestamp = u64;

/// Milliseconds elapsed between two timestamps
///
/// Saturates at zero if the clock appears to run backwards.
pub fn elapsed_ms(earlier: Timestamp, later: Timestamp) -> u64 {
    later.saturating_sub(earlier)
}

/// Controllable time source for tests and host simulation
///
/// Uses interior mutability so a test can advance time while the node holds
/// a shared reference to the clock.
#[derive(Debug, Default)]
pub struct MockTimeSource {
    now: Cell<Timestamp>,
}

impl MockTimeSource {
    /// Create a clock reading `start` milliseconds
    pub fn new(start: Timestamp) -> Self {
        Self { now: Cell::new(start) }
    }

    /// Jump to an absolute time
    pub fn set(&self, timestamp: Timestamp) {
        self.now.set(timestamp);
    }

    /// Move forward by `ms`
    pub fn advance(&self, ms: u64) {
        self.now.set(self.now.get().saturating_add(ms));
    }
}

impl TimeSource for MockTimeSource {
    fn now(&self) -> Timestamp {
        self.now.get()
    }

    fn is_wall_clock(&self) -> bool {
        false
    }

    fn precision_ms(&self) -> u32 {
        1
    }
}

/// Monotonic host clock measured from construction (requires std)
#[cfg(feature = "std")]
#[derive(Debug, Clone)]
pub struct HostClock {
    origin: std::time::Instant,
}

#[cfg(feature = "std")]
impl HostClock {
    /// Start a clock at zero
    pub fn new() -> Self {
        Self { origin: std::time::Instant::now() }
    }
}

#[cfg(feature = "std")]
impl Default for HostClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "std")]
impl TimeSource for HostClock {
    fn now(&self) -> Timestamp {
        self.origin.elapsed().as_millis() as Timestamp
    }

    fn is_wall_clock(&self) -> bool {
        false
    }

    fn precision_ms(&self) -> u32 {
        1
    }
}
