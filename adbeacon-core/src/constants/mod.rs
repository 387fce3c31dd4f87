//! Constants for AdBeacon Core
//!
//! Centralizes every numeric limit and default used by the pipeline so that
//! configuration validation, buffer sizing, and the wire format agree.
//!
//! ## Organization
//!
//! - **Radio**: BLE advertising units, legal interval range, TX power levels
//! - **Pipeline**: buffer capacities, estimator floors, default tuning values

/// BLE advertising limits and unit conversions.
pub mod radio;

/// Buffer capacities and default tuning for the sensing pipeline.
pub mod pipeline;

pub use radio::{
    ADV_INTERVAL_UNIT_US, ADV_INTERVAL_MIN_MS, ADV_INTERVAL_MAX_MS,
    MAX_ADV_PAYLOAD_LEN,
};

pub use pipeline::{
    MAX_WINDOW_SIZE, MAX_VOLATILITY_WINDOW, MAX_CLASSES, FEATURE_COUNT,
    PROBABILITY_FLOOR, PROBABILITY_SUM_TOLERANCE,
};
