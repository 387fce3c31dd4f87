//! Decoded status records

use adbeacon_core::{ActivityState, StatusPacket};
use serde::{Deserialize, Serialize};

use crate::error::ReceiverResult;
use crate::tracker::SequenceEvent;

/// One decoded broadcast, as handed to downstream consumers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusRecord {
    /// Receiver clock at reception (ms)
    pub received_at_ms: u64,
    /// Node clock at encode time (ms, wraps at 2^32)
    pub device_timestamp_ms: u32,
    /// Packet sequence number
    pub sequence: u8,
    /// Node state
    pub state: ActivityState,
    /// Uncertainty, dequantized
    pub uncertainty: f32,
    /// Uncertainty as transmitted
    pub uncertainty_q8: u8,
    /// Battery level in percent
    pub battery_pct: u8,
    /// Advertising interval the node reported (ms)
    pub interval_ms: u16,
    /// Last accelerometer sample (milli-g)
    pub accel_milli_g: [i16; 3],
    /// Packets missing immediately before this one
    pub lost_before: u8,
    /// True when the sequence number was behind or equal to the previous one
    pub out_of_order: bool,
}

impl StatusRecord {
    /// Build a record from a decoded packet and its sequence classification
    pub fn from_packet(packet: &StatusPacket, received_at_ms: u64, event: SequenceEvent) -> Self {
        let lost_before = match event {
            SequenceEvent::Gap { lost } => lost,
            _ => 0,
        };
        Self {
            received_at_ms,
            device_timestamp_ms: packet.timestamp_ms,
            sequence: packet.sequence,
            state: packet.state,
            uncertainty: packet.uncertainty(),
            uncertainty_q8: packet.uncertainty_q8,
            battery_pct: packet.battery_pct,
            interval_ms: packet.interval_ms,
            accel_milli_g: packet.accel_milli_g,
            lost_before,
            out_of_order: matches!(event, SequenceEvent::Duplicate | SequenceEvent::Late),
        }
    }

    /// Serialize as a single JSON line (no trailing newline)
    pub fn to_json_line(&self) -> ReceiverResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse a line written by [`StatusRecord::to_json_line`]
    pub fn from_json_line(line: &str) -> ReceiverResult<Self> {
        Ok(serde_json::from_str(line.trim())?)
    }
}
