//! Receiver-side tooling for AdBeacon status broadcasts
//!
//! Nodes put a fixed 21-byte status record into their manufacturer data.
//! A scanner (phone, gateway, or logging script) hands the raw bytes to this
//! crate, which decodes them with the same codec the node uses and keeps the
//! bookkeeping needed to judge the link:
//!
//! - Sequence gaps, counted modulo 256 so the 255 → 0 wrap is not loss
//! - Inter-arrival statistics (mean, median, p95, p99)
//! - Malformed packets, dropped and counted, never reported partially
//!
//! Decoded packets come out as [`StatusRecord`]s that serialize to one JSON
//! object per line.
//!
//! ```
//! use adbeacon_core::{ActivityState, StatusPacket};
//! use adbeacon_receiver::Receiver;
//!
//! let mut receiver = Receiver::new();
//! let bytes = StatusPacket::new(7, ActivityState::Active, 0.1, 80, 12_000, 100).encode();
//!
//! let record = receiver.ingest(&bytes, 5_000).unwrap();
//! assert_eq!(record.state, ActivityState::Active);
//! assert_eq!(receiver.stats().accepted, 1);
//! ```

pub mod error;
pub mod hex;
pub mod receiver;
pub mod record;
pub mod stats;
pub mod tracker;

// Re-export common types
pub use error::{ReceiverError, ReceiverResult};
pub use hex::parse_hex;
pub use receiver::{LinkSummary, Receiver, ReceiverStats};
pub use record::StatusRecord;
pub use stats::{IntervalStats, IntervalSummary};
pub use tracker::{SequenceEvent, SequenceTracker};
