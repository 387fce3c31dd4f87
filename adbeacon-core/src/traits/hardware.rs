//! Hardware capabilities: motion input, radio output, battery level
//!
//! ## Example Implementation
//!
//! ```rust
//! use adbeacon_core::traits::RadioAdvertiser;
//! use adbeacon_core::{AdvertisingConfig, RadioError};
//!
//! struct SoftDeviceAdvertiser {
//!     // ... handle to the BLE stack's advertising set
//! }
//!
//! impl RadioAdvertiser for SoftDeviceAdvertiser {
//!     fn apply_config(&mut self, config: &AdvertisingConfig) -> Result<(), RadioError> {
//!         // sd_ble_gap_adv_set_configure with config.interval_units()
//!         let _ = config;
//!         Ok(())
//!     }
//!
//!     fn set_payload(&mut self, payload: &[u8]) -> Result<(), RadioError> {
//!         // Rewrite manufacturer-specific data in the advertising set
//!         let _ = payload;
//!         Ok(())
//!     }
//! }
//! ```

use crate::controller::AdvertisingConfig;
use crate::errors::{RadioError, SensorError};
use crate::features::MotionSample;

/// Source of 6-axis motion samples
///
/// Pull-based and non-blocking, in the `nb` style: return
/// `Err(nb::Error::WouldBlock)` when the FIFO holds no new sample.
pub trait MotionSource {
    /// Fetch the next sample if one is ready
    fn read(&mut self) -> nb::Result<MotionSample, SensorError>;
}

/// Connectionless broadcast radio
///
/// Implementations always advertise non-connectable and undirected; the
/// controller never requests a connection.
pub trait RadioAdvertiser {
    /// Reconfigure interval and TX power
    fn apply_config(&mut self, config: &AdvertisingConfig) -> Result<(), RadioError>;

    /// Replace the manufacturer-data payload carried by each advertisement
    fn set_payload(&mut self, payload: &[u8]) -> Result<(), RadioError>;
}

/// Battery state of charge
pub trait BatteryGauge {
    /// State of charge in percent; values above 100 are clamped by the codec
    fn percent(&self) -> u8;
}

impl<M: MotionSource + ?Sized> MotionSource for &mut M {
    fn read(&mut self) -> nb::Result<MotionSample, SensorError> {
        (**self).read()
    }
}

impl<R: RadioAdvertiser + ?Sized> RadioAdvertiser for &mut R {
    fn apply_config(&mut self, config: &AdvertisingConfig) -> Result<(), RadioError> {
        (**self).apply_config(config)
    }

    fn set_payload(&mut self, payload: &[u8]) -> Result<(), RadioError> {
        (**self).set_payload(payload)
    }
}

impl<B: BatteryGauge + ?Sized> BatteryGauge for &B {
    fn percent(&self) -> u8 {
        (**self).percent()
    }
}
