//! Capability Traits for AdBeacon
//!
//! Narrow interfaces that separate the controller logic from any particular
//! IMU driver, BLE stack, fuel gauge, or timer peripheral. The core has no
//! compile-time dependency on a vendor HAL: a board crate implements these
//! four traits and hands them to [`NodeContext::tick`](crate::NodeContext::tick).
//!
//! ## Module Organization
//!
//! - [`time`] - Monotonic time source abstraction
//! - [`hardware`] - Motion, radio, and battery capabilities
//!
//! ## Call Contexts
//!
//! All trait methods are called from the single cooperative loop. None of
//! them may block: a motion source with no fresh sample returns
//! `nb::Error::WouldBlock`, and a radio that cannot accept an update right
//! now returns [`RadioError::Busy`](crate::RadioError::Busy).

pub mod hardware;
pub mod time;

pub use hardware::{BatteryGauge, MotionSource, RadioAdvertiser};
pub use time::TimeSource;
