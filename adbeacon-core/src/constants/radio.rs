//! Radio Constants
//!
//! Advertising parameters expressed in the units a BLE controller expects.

/// Advertising interval tick (microseconds).
///
/// HCI LE Set Advertising Parameters takes intervals in 0.625 ms units.
pub const ADV_INTERVAL_UNIT_US: u32 = 625;

/// Smallest advertising interval accepted by configuration (milliseconds).
///
/// Legacy non-connectable advertising allows 100 ms on 4.x controllers;
/// 5.x controllers accept 20 ms. The lower bound admits both.
pub const ADV_INTERVAL_MIN_MS: u32 = 20;

/// Largest advertising interval (milliseconds), 0x4000 ticks.
pub const ADV_INTERVAL_MAX_MS: u32 = 10_240;

/// Legacy advertising data limit (bytes).
///
/// 31 bytes minus flags (3) and manufacturer-data header (4) leaves 24 for
/// the status record.
pub const MAX_ADV_PAYLOAD_LEN: usize = 24;

/// Default interval while the classifier is confident the wearer is still.
pub const DEFAULT_INTERVAL_QUIET_MS: u32 = 2000;

/// Default interval while the classification is ambiguous.
pub const DEFAULT_INTERVAL_UNCERTAIN_MS: u32 = 500;

/// Default interval while activity is confidently detected.
pub const DEFAULT_INTERVAL_ACTIVE_MS: u32 = 100;

/// Convert milliseconds to 0.625 ms advertising ticks, saturating at `u32::MAX`.
pub const fn ms_to_adv_units(ms: u32) -> u32 {
    let ticks = ms as u64 * 1000 / ADV_INTERVAL_UNIT_US as u64;
    if ticks > u32::MAX as u64 {
        u32::MAX
    } else {
        ticks as u32
    }
}
