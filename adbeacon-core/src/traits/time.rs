//! Time Source Abstraction for Embedded Systems
//!
//! This module provides the `TimeSource` trait which abstracts time handling
//! across bare-metal timers, RTOS tick counters, and test clocks.
//!
//! ## Common Implementations
//!
//! - `MockTimeSource`: Controllable time for testing
//! - `HostClock`: `std::time::Instant` based monotonic clock (std only)
//! - Board crates: RTC or SysTick counters

use crate::time::Timestamp;

/// Source of time for the node
///
/// ## Implementation Requirements
///
/// - `now()` must be monotonic; the packet timestamp, dwell timer and
///   starvation guard all assume time never runs backwards
/// - `now()` must be callable from the main loop without blocking
/// - Counter wraparound must be handled by the implementation (extend a
///   32-bit RTC to 64 bits before returning)
///
/// ## Example Implementation
///
/// ```rust
/// use adbeacon_core::traits::TimeSource;
/// use adbeacon_core::time::Timestamp;
///
/// struct RtcTicks {
///     // ... RTC peripheral handle
/// }
///
/// impl TimeSource for RtcTicks {
///     fn now(&self) -> Timestamp {
///         // Read 32.768 kHz RTC and convert to milliseconds
///         0 // placeholder
///     }
///
///     fn is_wall_clock(&self) -> bool {
///         false
///     }
///
///     fn precision_ms(&self) -> u32 {
///         1
///     }
/// }
/// ```
pub trait TimeSource {
    /// Current timestamp in milliseconds since boot
    fn now(&self) -> Timestamp;

    /// Check if this source provides wall clock time (vs monotonic)
    fn is_wall_clock(&self) -> bool;

    /// Smallest difference this source can measure, in milliseconds
    fn precision_ms(&self) -> u32;
}

impl<T: TimeSource + ?Sized> TimeSource for &T {
    fn now(&self) -> Timestamp {
        (**self).now()
    }

    fn is_wall_clock(&self) -> bool {
        (**self).is_wall_clock()
    }

    fn precision_ms(&self) -> u32 {
        (**self).precision_ms()
    }
}
