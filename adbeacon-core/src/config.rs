//! Node Configuration
//!
//! Every tunable of the pipeline lives in [`NodeConfig`]: state thresholds,
//! estimator weights, per-state radio parameters, the dwell rate limit, and
//! window cadence. Nothing is hard-coded, so a test harness can probe
//! threshold boundaries exactly.
//!
//! ## Presets
//!
//! Two threshold/interval sets are in circulation for this node and they
//! disagree. Both are provided; neither is the "right" one:
//!
//! | Preset | θ_q_in | θ_q_out | θ_a_in | θ_a_out | Quiet | Uncertain | Active |
//! |--------|--------|---------|--------|---------|-------|-----------|--------|
//! | [`NodeConfig::default`] | 0.25 | 0.30 | 0.60 | 0.55 | 2000 ms | 500 ms | 100 ms |
//! | [`NodeConfig::two_threshold`] | 0.30 | 0.30 | 0.70 | 0.70 | 1000 ms | 200 ms | 100 ms |
//!
//! The two-threshold preset has no hysteresis band; validation accepts it
//! but logs a warning.
//!
//! ## Loading
//!
//! With `std`, configs load from JSON. Missing keys take their defaults:
//!
//! ```rust
//! use adbeacon_core::NodeConfig;
//!
//! let config = NodeConfig::from_json_str(r#"{ "theta_a_in": 0.65, "rate_limit_s": 1.0 }"#).unwrap();
//! assert_eq!(config.theta_a_in, 0.65);
//! assert_eq!(config.rate_limit_ms(), 1000);
//! ```

use crate::constants::pipeline::{
    DEFAULT_ACTIVE_CONFIRM_WINDOWS, DEFAULT_EWMA_ALPHA, DEFAULT_LOOP_BUDGET_MS, DEFAULT_NUM_CLASSES,
    DEFAULT_RATE_LIMIT_S, DEFAULT_SAMPLE_RATE_HZ, DEFAULT_STALL_FACTOR, DEFAULT_VOLATILITY_BETA,
    DEFAULT_VOLATILITY_WINDOW, DEFAULT_WINDOW_SIZE,
};
use crate::constants::radio::{
    DEFAULT_INTERVAL_ACTIVE_MS, DEFAULT_INTERVAL_QUIET_MS, DEFAULT_INTERVAL_UNCERTAIN_MS,
};
use crate::constants::{ADV_INTERVAL_MAX_MS, ADV_INTERVAL_MIN_MS, MAX_CLASSES, MAX_VOLATILITY_WINDOW, MAX_WINDOW_SIZE};
use crate::controller::TxPower;
use crate::errors::ConfigError;
use crate::state::Thresholds;

/// What the controller does when a transition arrives before the dwell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum DwellPolicy {
    /// Hold the radio change until the new state has been held for the dwell
    #[default]
    Defer,
    /// Apply at once, accepting the reconfiguration cost
    Immediate,
}

/// Complete node configuration
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct NodeConfig {
    /// Fall below to return Uncertain → Quiet
    pub theta_q_in: f32,
    /// Rise above to leave Quiet
    pub theta_q_out: f32,
    /// Rise above to enter Active
    pub theta_a_in: f32,
    /// Fall below to leave Active
    pub theta_a_out: f32,

    /// Context-score weight on uncertainty (α)
    pub ewma_alpha: f32,
    /// Volatility EWMA smoothing (β)
    pub volatility_beta: f32,
    /// Uncertainty history length (W)
    pub volatility_window: usize,

    /// Quiet advertising interval (ms)
    #[cfg_attr(feature = "serde", serde(alias = "adv_interval_quiet"))]
    pub adv_interval_quiet_ms: u32,
    /// Uncertain advertising interval (ms)
    #[cfg_attr(feature = "serde", serde(alias = "adv_interval_uncertain"))]
    pub adv_interval_uncertain_ms: u32,
    /// Active advertising interval (ms)
    #[cfg_attr(feature = "serde", serde(alias = "adv_interval_active"))]
    pub adv_interval_active_ms: u32,
    /// Quiet TX power
    pub tx_power_quiet: TxPower,
    /// Uncertain TX power
    pub tx_power_uncertain: TxPower,
    /// Active TX power
    pub tx_power_active: TxPower,

    /// Minimum dwell before radio reconfiguration (s)
    pub rate_limit_s: f32,
    /// Behaviour when the dwell is not met
    pub dwell_policy: DwellPolicy,

    /// Samples per window
    pub window_size: usize,
    /// New samples between windows; `None` means no overlap
    pub window_stride: Option<usize>,
    /// IMU sampling rate (Hz)
    pub sample_rate_hz: f32,
    /// Starvation limit as a multiple of the sample period
    pub stall_factor: f32,

    /// Consecutive windows above θ_a_in needed to enter Active
    pub active_confirm_windows: u8,
    /// Classes reported by the classifier
    pub num_classes: usize,
    /// Inference time budget (ms)
    pub loop_budget_ms: u64,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            theta_q_in: 0.25,
            theta_q_out: 0.30,
            theta_a_in: 0.60,
            theta_a_out: 0.55,
            ewma_alpha: DEFAULT_EWMA_ALPHA,
            volatility_beta: DEFAULT_VOLATILITY_BETA,
            volatility_window: DEFAULT_VOLATILITY_WINDOW,
            adv_interval_quiet_ms: DEFAULT_INTERVAL_QUIET_MS,
            adv_interval_uncertain_ms: DEFAULT_INTERVAL_UNCERTAIN_MS,
            adv_interval_active_ms: DEFAULT_INTERVAL_ACTIVE_MS,
            tx_power_quiet: TxPower::Minus8Dbm,
            tx_power_uncertain: TxPower::Minus4Dbm,
            tx_power_active: TxPower::ZeroDbm,
            rate_limit_s: DEFAULT_RATE_LIMIT_S,
            dwell_policy: DwellPolicy::Defer,
            window_size: DEFAULT_WINDOW_SIZE,
            window_stride: None,
            sample_rate_hz: DEFAULT_SAMPLE_RATE_HZ,
            stall_factor: DEFAULT_STALL_FACTOR,
            active_confirm_windows: DEFAULT_ACTIVE_CONFIRM_WINDOWS,
            num_classes: DEFAULT_NUM_CLASSES,
            loop_budget_ms: DEFAULT_LOOP_BUDGET_MS,
        }
    }
}

impl NodeConfig {
    /// Two-threshold preset (θ_low 0.3, θ_high 0.7; 1000/200/100 ms)
    pub fn two_threshold() -> Self {
        Self {
            theta_q_in: 0.3,
            theta_q_out: 0.3,
            theta_a_in: 0.7,
            theta_a_out: 0.7,
            adv_interval_quiet_ms: 1000,
            adv_interval_uncertain_ms: 200,
            adv_interval_active_ms: 100,
            ..Self::default()
        }
    }

    /// State-machine thresholds
    pub fn thresholds(&self) -> Thresholds {
        Thresholds {
            quiet_in: self.theta_q_in,
            quiet_out: self.theta_q_out,
            active_in: self.theta_a_in,
            active_out: self.theta_a_out,
        }
    }

    /// Effective window stride (samples)
    pub fn stride(&self) -> usize {
        self.window_stride.unwrap_or(self.window_size)
    }

    /// Dwell rate limit in milliseconds
    pub fn rate_limit_ms(&self) -> u64 {
        if !self.rate_limit_s.is_finite() || self.rate_limit_s <= 0.0 {
            return 0;
        }
        libm::roundf(self.rate_limit_s * 1000.0) as u64
    }

    /// Nominal time between windows (ms)
    pub fn window_period_ms(&self) -> u64 {
        if self.sample_rate_hz <= 0.0 {
            return 0;
        }
        libm::roundf(self.stride() as f32 * 1000.0 / self.sample_rate_hz) as u64
    }

    /// Check every option; the node refuses to start on error
    pub fn validate(&self) -> Result<(), ConfigError> {
        let thresholds = self.thresholds();
        thresholds.validate()?;
        if !thresholds.has_hysteresis() {
            log_warn!(
                "thresholds {:?} have no hysteresis band; expect state chatter near boundaries",
                thresholds
            );
        }

        check_weight("ewma_alpha", self.ewma_alpha)?;
        check_weight("volatility_beta", self.volatility_beta)?;

        if !(2..=MAX_VOLATILITY_WINDOW).contains(&self.volatility_window) {
            return Err(ConfigError::InvalidWindow {
                reason: "volatility_window must be in 2..=32",
            });
        }

        for interval_ms in [
            self.adv_interval_quiet_ms,
            self.adv_interval_uncertain_ms,
            self.adv_interval_active_ms,
        ] {
            if !(ADV_INTERVAL_MIN_MS..=ADV_INTERVAL_MAX_MS).contains(&interval_ms) {
                return Err(ConfigError::InvalidInterval {
                    interval_ms,
                    min_ms: ADV_INTERVAL_MIN_MS,
                    max_ms: ADV_INTERVAL_MAX_MS,
                });
            }
        }

        if !self.rate_limit_s.is_finite() || self.rate_limit_s < 0.0 {
            return Err(ConfigError::InvalidRateLimit { value: self.rate_limit_s });
        }

        if !(2..=MAX_WINDOW_SIZE).contains(&self.window_size) {
            return Err(ConfigError::InvalidWindow {
                reason: "window_size must be in 2..=128",
            });
        }
        let stride = self.stride();
        if stride == 0 || stride > self.window_size {
            return Err(ConfigError::InvalidWindow {
                reason: "window_stride must be in 1..=window_size",
            });
        }
        if !self.sample_rate_hz.is_finite() || self.sample_rate_hz <= 0.0 {
            return Err(ConfigError::InvalidWindow {
                reason: "sample_rate_hz must be positive",
            });
        }
        if !self.stall_factor.is_finite() || self.stall_factor < 1.0 {
            return Err(ConfigError::InvalidWindow {
                reason: "stall_factor must be at least 1",
            });
        }

        if !(2..=MAX_CLASSES).contains(&self.num_classes) {
            return Err(ConfigError::InvalidClassCount { count: self.num_classes });
        }

        Ok(())
    }
}

fn check_weight(name: &'static str, value: f32) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::InvalidWeight { name, value })
    }
}

#[cfg(feature = "std")]
impl NodeConfig {
    /// Parse and validate a JSON document
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json).map_err(|_err| {
            log_error!("config parse failed: {}", _err);
            ConfigError::Parse { reason: "malformed JSON or wrong field type" }
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse, and validate a JSON file
    pub fn from_json_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path.as_ref()).map_err(|_err| {
            log_error!("cannot read {}: {}", path.as_ref().display(), _err);
            ConfigError::Parse { reason: "cannot read configuration file" }
        })?;
        Self::from_json_str(&json)
    }

    /// Serialize to pretty JSON
    pub fn to_json_string(&self) -> Result<String, ConfigError> {
        serde_json::to_string_pretty(self).map_err(|_| ConfigError::Parse { reason: "serialization failed" })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_validate() {
        assert!(NodeConfig::default().validate().is_ok());
        assert!(NodeConfig::two_threshold().validate().is_ok());
        assert!(!NodeConfig::two_threshold().thresholds().has_hysteresis());
    }

    #[test]
    fn derived_values() {
        let config = NodeConfig::default();
        assert_eq!(config.rate_limit_ms(), 2000);
        assert_eq!(config.stride(), 50);
        assert_eq!(config.window_period_ms(), 1000);

        let overlapping = NodeConfig { window_stride: Some(25), ..NodeConfig::default() };
        assert_eq!(overlapping.window_period_ms(), 500);
    }

    #[test]
    fn rejects_bad_thresholds() {
        let config = NodeConfig { theta_q_in: 0.4, theta_q_out: 0.3, ..NodeConfig::default() };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidThresholds { .. })));
    }

    #[test]
    fn rejects_bad_weights_and_intervals() {
        let config = NodeConfig { ewma_alpha: 1.2, ..NodeConfig::default() };
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidWeight { name: "ewma_alpha", value: 1.2 })
        );

        let config = NodeConfig { adv_interval_active_ms: 10, ..NodeConfig::default() };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidInterval { interval_ms: 10, .. })));
    }

    #[test]
    fn rejects_bad_window() {
        let config = NodeConfig { window_size: 200, ..NodeConfig::default() };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidWindow { .. })));

        let config = NodeConfig { window_stride: Some(60), ..NodeConfig::default() };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidWindow { .. })));

        let config = NodeConfig { sample_rate_hz: 0.0, ..NodeConfig::default() };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidWindow { .. })));

        let config = NodeConfig { num_classes: 1, ..NodeConfig::default() };
        assert_eq!(config.validate(), Err(ConfigError::InvalidClassCount { count: 1 }));

        let config = NodeConfig { rate_limit_s: -1.0, ..NodeConfig::default() };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidRateLimit { .. })));
    }

    #[cfg(feature = "std")]
    #[test]
    fn json_partial_document() {
        let config = NodeConfig::from_json_str(
            r#"{ "adv_interval_quiet": 1500, "dwell_policy": "immediate", "window_stride": 10 }"#,
        )
        .unwrap();

        assert_eq!(config.adv_interval_quiet_ms, 1500);
        assert_eq!(config.dwell_policy, DwellPolicy::Immediate);
        assert_eq!(config.stride(), 10);
        assert_eq!(config.theta_q_in, 0.25);
    }

    #[cfg(feature = "std")]
    #[test]
    fn json_rejects_invalid() {
        assert!(matches!(NodeConfig::from_json_str("{ not json"), Err(ConfigError::Parse { .. })));
        assert!(matches!(
            NodeConfig::from_json_str(r#"{ "theta_a_out": 0.9 }"#),
            Err(ConfigError::InvalidThresholds { .. })
        ));
    }

    #[cfg(feature = "std")]
    #[test]
    fn json_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("node.json");
        std::fs::write(&path, NodeConfig::two_threshold().to_json_string().unwrap()).unwrap();

        assert_eq!(NodeConfig::from_json_file(&path).unwrap(), NodeConfig::two_threshold());
        assert!(NodeConfig::from_json_file(dir.path().join("missing.json")).is_err());
    }
}
