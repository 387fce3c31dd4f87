//! Error Types for the Sensing and Broadcast Pipeline
//!
//! ## Design Philosophy
//!
//! The node runs for months on a coin cell, so no error in this crate is allowed
//! to stop the loop. Every variant is small, `Copy`, and carries only inline
//! numbers or `&'static str` reasons so it can be counted, logged, and dropped
//! without touching a heap.
//!
//! ## Error Categories
//!
//! ### Window-level failures (`CoreError`)
//! - `InputStarvation`: the IMU went silent for longer than the stall limit.
//!   The partial window is discarded and the last state is held.
//! - `InvalidSample`: a motion sample contained NaN or infinity.
//! - `ClassCountMismatch`, `ProbabilityOutOfRange`, `ProbabilitySum`: the
//!   classifier broke its output contract. The window is skipped, the previous
//!   state is retained, and the classifier error counter increments.
//! - `DeadlineExceeded`: inference ran past the loop budget.
//! - `Radio`: the radio refused a parameter or payload update.
//!
//! ### Receiver-side failures (`DecodeError`)
//! - Wrong length, unknown format version, or unknown state byte. The packet
//!   is dropped; nothing partial reaches downstream consumers.
//!
//! ### Configuration failures (`ConfigError`)
//! - Rejected before the node starts, or when a runtime threshold change
//!   would break the hysteresis ordering.
//!
//! ## Error Handling Strategy
//!
//! ```rust
//! use adbeacon_core::{CoreError, TickOutcome};
//!
//! fn report(outcome: TickOutcome) {
//!     match outcome {
//!         TickOutcome::Degraded(CoreError::InputStarvation { silent_ms, .. }) => {
//!             // IMU stalled; state is held until samples resume
//!             let _ = silent_ms;
//!         }
//!         TickOutcome::Degraded(CoreError::ProbabilitySum { .. }) => {
//!             // Model output is broken; window skipped
//!         }
//!         _ => {}
//!     }
//! }
//! ```

use thiserror_no_std::Error;

/// Result type for pipeline operations
pub type CoreResult<T> = Result<T, CoreError>;

/// Failures raised by the radio capability
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RadioError {
    /// Requested interval or power is not supported by the radio
    #[error("Radio rejected parameters: {reason}")]
    Rejected {
        /// Vendor-neutral reason
        reason: &'static str,
    },

    /// Radio stack busy (e.g. advertising set being torn down)
    #[error("Radio busy")]
    Busy,

    /// Payload exceeds the advertising data limit
    #[error("Payload of {len} bytes exceeds advertising limit")]
    PayloadTooLarge {
        /// Offered payload length
        len: usize,
    },
}

/// Failures raised by the motion source capability
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    /// Bus transaction failed
    #[error("Sensor bus error")]
    Bus,

    /// Device not responding or not initialized
    #[error("Sensor offline")]
    Offline,
}

/// Window-level pipeline errors - kept small for embedded use
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum CoreError {
    /// No motion sample arrived within the stall limit
    #[error("Input starvation: silent for {silent_ms}ms (limit {limit_ms}ms)")]
    InputStarvation {
        /// Time since the last accepted sample
        silent_ms: u64,
        /// Configured stall limit
        limit_ms: u64,
    },

    /// Motion sample contained a non-finite component
    #[error("Invalid motion sample: not a finite number")]
    InvalidSample,

    /// Motion source failed outright
    #[error("Motion source failed: {0}")]
    Sensor(SensorError),

    /// Classifier produced the wrong number of classes
    #[error("Classifier returned {actual} classes, expected {expected}")]
    ClassCountMismatch {
        /// Configured class count
        expected: usize,
        /// Length of the returned vector
        actual: usize,
    },

    /// A probability is NaN, negative, or greater than one
    #[error("Classifier returned a probability outside [0, 1]")]
    ProbabilityOutOfRange,

    /// Probabilities do not sum to one within tolerance
    #[error("Class probabilities sum to {sum}, expected 1.0")]
    ProbabilitySum {
        /// Observed sum
        sum: f32,
    },

    /// Inference ran past the loop budget
    #[error("Inference took {elapsed_ms}ms, budget {budget_ms}ms")]
    DeadlineExceeded {
        /// Measured inference time
        elapsed_ms: u64,
        /// Configured loop budget
        budget_ms: u64,
    },

    /// Radio refused an update
    #[error("Radio error: {0}")]
    Radio(RadioError),
}

impl From<RadioError> for CoreError {
    fn from(err: RadioError) -> Self {
        CoreError::Radio(err)
    }
}

impl From<SensorError> for CoreError {
    fn from(err: SensorError) -> Self {
        CoreError::Sensor(err)
    }
}

impl CoreError {
    /// True for errors raised because the classifier broke its output contract
    pub fn is_classifier_contract(&self) -> bool {
        matches!(
            self,
            CoreError::ClassCountMismatch { .. }
                | CoreError::ProbabilityOutOfRange
                | CoreError::ProbabilitySum { .. }
        )
    }
}

/// Status packet decode failures
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// Buffer length differs from the fixed payload length
    #[error("Packet is {actual} bytes, expected {expected}")]
    WrongLength {
        /// Fixed payload length
        expected: usize,
        /// Received length
        actual: usize,
    },

    /// Leading format byte is not a version this decoder understands
    #[error("Unknown packet format version 0x{0:02X}")]
    UnknownVersion(u8),

    /// State byte outside the documented encoding
    #[error("Unknown state code {0}")]
    UnknownState(u8),
}

/// Configuration validation failures
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum ConfigError {
    /// Thresholds violate the hysteresis ordering
    #[error("Invalid thresholds: {reason}")]
    InvalidThresholds {
        /// Which ordering rule was broken
        reason: &'static str,
    },

    /// Blend or smoothing weight outside [0, 1]
    #[error("Weight {name}={value} outside [0, 1]")]
    InvalidWeight {
        /// Option name
        name: &'static str,
        /// Offending value
        value: f32,
    },

    /// Advertising interval outside the radio's legal range
    #[error("Advertising interval {interval_ms}ms outside [{min_ms}, {max_ms}]")]
    InvalidInterval {
        /// Offending interval
        interval_ms: u32,
        /// Smallest legal interval
        min_ms: u32,
        /// Largest legal interval
        max_ms: u32,
    },

    /// Window, stride, or sampling parameters unusable
    #[error("Invalid window configuration: {reason}")]
    InvalidWindow {
        /// Which rule was broken
        reason: &'static str,
    },

    /// Negative or non-finite dwell time
    #[error("Invalid rate limit {value}s")]
    InvalidRateLimit {
        /// Offending value
        value: f32,
    },

    /// Class count outside the supported range
    #[error("Invalid class count {count}")]
    InvalidClassCount {
        /// Offending value
        count: usize,
    },

    /// Configuration document could not be parsed
    #[error("Configuration parse error: {reason}")]
    Parse {
        /// Short reason
        reason: &'static str,
    },
}

#[cfg(feature = "defmt")]
impl defmt::Format for CoreError {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            Self::InputStarvation { silent_ms, limit_ms } =>
                defmt::write!(fmt, "Starved {}ms (limit {}ms)", silent_ms, limit_ms),
            Self::InvalidSample =>
                defmt::write!(fmt, "Invalid sample"),
            Self::Sensor(_) =>
                defmt::write!(fmt, "Sensor failure"),
            Self::ClassCountMismatch { expected, actual } =>
                defmt::write!(fmt, "Classes {} != {}", actual, expected),
            Self::ProbabilityOutOfRange =>
                defmt::write!(fmt, "Probability out of range"),
            Self::ProbabilitySum { sum } =>
                defmt::write!(fmt, "Probability sum {}", sum),
            Self::DeadlineExceeded { elapsed_ms, budget_ms } =>
                defmt::write!(fmt, "Inference {}ms > {}ms", elapsed_ms, budget_ms),
            Self::Radio(_) =>
                defmt::write!(fmt, "Radio error"),
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for DecodeError {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            Self::WrongLength { expected, actual } =>
                defmt::write!(fmt, "Length {} != {}", actual, expected),
            Self::UnknownVersion(v) =>
                defmt::write!(fmt, "Unknown version {}", v),
            Self::UnknownState(s) =>
                defmt::write!(fmt, "Unknown state {}", s),
        }
    }
}
