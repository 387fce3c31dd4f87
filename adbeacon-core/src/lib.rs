//! Core controller for AdBeacon sensor nodes
//!
//! Turns a continuous IMU stream into a three-state activity classification and
//! uses the confidence of that classification to choose how often the radio
//! broadcasts. Designed for battery-powered nodes with limited resources.
//!
//! Key constraints:
//! - Runs without an allocator (`no_std`, fixed-capacity buffers only)
//! - One cooperative loop; radio callbacks only hand data off, never block
//! - A full window pass must stay well inside a 100 ms loop budget
//!
//! Data flows strictly downstream:
//!
//! ```text
//! samples → window → features → probabilities → uncertainty/volatility
//!         → context score → state → radio parameters + status packet
//! ```
//!
//! ```no_run
//! use adbeacon_core::{NodeConfig, NodeContext};
//!
//! let config = NodeConfig::default();
//! let mut node = NodeContext::new(config).expect("default config is valid");
//!
//! // Inside the sampling-timer loop:
//! // let outcome = node.tick(&mut imu, &classifier, &mut radio, &battery, &clock);
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![deny(unsafe_code)]
#![warn(missing_docs)]

#[macro_use]
mod macros;

pub mod buffer;
pub mod classifier;
pub mod codec;
pub mod config;
pub mod console;
pub mod constants;
pub mod controller;
pub mod errors;
pub mod estimator;
pub mod features;
pub mod handoff;
pub mod node;
pub mod state;
pub mod time;
pub mod traits;

// Public API
pub use classifier::{Classifier, ClassProbabilities};
pub use codec::{StatusPacket, SequenceCounter, PACKET_LEN};
pub use config::{DwellPolicy, NodeConfig};
pub use controller::{AdvertisingConfig, AdvertisingController, TxPower};
pub use errors::{ConfigError, CoreError, DecodeError, RadioError, SensorError};
pub use estimator::{UncertaintyEstimator, UncertaintyMetrics};
pub use features::{FeatureVector, MotionSample, WindowExtractor};
pub use node::{NodeContext, NodeCounters, TickOutcome};
pub use state::{ActivityState, StateMachine, StateTransition, Thresholds};
pub use traits::{BatteryGauge, MotionSource, RadioAdvertiser, TimeSource};

/// Crate version, reported by the debug console
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
