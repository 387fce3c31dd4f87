//! Pipeline Constants
//!
//! Compile-time capacities bound every buffer on the device; runtime
//! configuration may choose smaller sizes but never larger.

/// Largest window the extractor can buffer (samples).
///
/// 128 × 24-byte samples = 3 KB of RAM.
pub const MAX_WINDOW_SIZE: usize = 128;

/// Largest uncertainty history used for volatility (windows).
pub const MAX_VOLATILITY_WINDOW: usize = 32;

/// Largest class count a classifier may report.
pub const MAX_CLASSES: usize = 8;

/// Length of the per-window feature vector.
///
/// 6 axis means + 6 axis standard deviations + 4 accelerometer magnitude
/// statistics (RMS, min, max, range).
pub const FEATURE_COUNT: usize = 16;

/// Probabilities at or below this floor contribute nothing to the entropy sum.
pub const PROBABILITY_FLOOR: f32 = 1e-4;

/// Accepted deviation of the probability sum from 1.0.
pub const PROBABILITY_SUM_TOLERANCE: f32 = 1e-2;

/// Default context-score weight on uncertainty (α).
pub const DEFAULT_EWMA_ALPHA: f32 = 0.7;

/// Default EWMA smoothing of volatility (β).
pub const DEFAULT_VOLATILITY_BETA: f32 = 0.3;

/// Default uncertainty history length (W).
pub const DEFAULT_VOLATILITY_WINDOW: usize = 10;

/// Default IMU sampling rate (Hz).
pub const DEFAULT_SAMPLE_RATE_HZ: f32 = 50.0;

/// Default window length (samples), one second at the default rate.
pub const DEFAULT_WINDOW_SIZE: usize = 50;

/// Default starvation limit, as a multiple of the nominal sample period.
pub const DEFAULT_STALL_FACTOR: f32 = 5.0;

/// Default number of consecutive windows above the active-entry threshold.
pub const DEFAULT_ACTIVE_CONFIRM_WINDOWS: u8 = 2;

/// Default minimum dwell before radio reconfiguration (seconds).
pub const DEFAULT_RATE_LIMIT_S: f32 = 2.0;

/// Default loop budget for one inference pass (milliseconds).
pub const DEFAULT_LOOP_BUDGET_MS: u64 = 100;

/// Default class count (still / walking / running).
pub const DEFAULT_NUM_CLASSES: usize = 3;
