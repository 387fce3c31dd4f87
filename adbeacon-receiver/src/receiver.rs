//! Packet ingestion
//!
//! [`Receiver`] is the single entry point for raw advertisement payloads
//! from one node. Malformed payloads are dropped and counted; nothing partial
//! reaches the returned records.

use std::io::{BufRead, Write};

use adbeacon_core::{ActivityState, StatusPacket};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::error::{ReceiverError, ReceiverResult};
use crate::hex::parse_hex;
use crate::record::StatusRecord;
use crate::stats::{IntervalStats, IntervalSummary};
use crate::tracker::{SequenceEvent, SequenceTracker};

/// Ingestion counters
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiverStats {
    /// Packets decoded successfully
    pub accepted: u64,
    /// Packets or scan-log lines dropped before decoding completed
    pub malformed: u64,
    /// State changes between consecutive in-order packets
    pub state_changes: u64,
    /// Accepted packets per state, in wire order
    pub per_state: [u64; 3],
}

/// Link report for one node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkSummary {
    /// Ingestion counters
    pub stats: ReceiverStats,
    /// Packets inferred lost from sequence gaps
    pub lost: u64,
    /// Repeated sequence numbers
    pub duplicates: u64,
    /// Packets behind the sequence reference point
    pub late: u64,
    /// Fraction of expected packets received
    pub delivery_ratio: Option<f64>,
    /// Inter-arrival distribution
    pub intervals: Option<IntervalSummary>,
    /// Gaps excluded from the distribution as outages
    pub interval_outliers: u64,
}

/// Receiver state for one node
#[derive(Debug, Clone, Default)]
pub struct Receiver {
    tracker: SequenceTracker,
    intervals: IntervalStats,
    stats: ReceiverStats,
    last_arrival: Option<u64>,
    last_state: Option<ActivityState>,
}

impl Receiver {
    /// Create a receiver with the default outage cutoff
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a receiver with a custom outage cutoff for interval statistics
    pub fn with_outlier_cutoff(outlier_ms: u64) -> Self {
        Self {
            intervals: IntervalStats::new(outlier_ms),
            ..Self::default()
        }
    }

    /// Decode one payload received at `received_at_ms` (receiver clock)
    pub fn ingest(&mut self, bytes: &[u8], received_at_ms: u64) -> ReceiverResult<StatusRecord> {
        let packet = match StatusPacket::decode(bytes) {
            Ok(packet) => packet,
            Err(err) => {
                self.stats.malformed += 1;
                debug!("Dropping malformed packet ({} bytes): {}", bytes.len(), err);
                return Err(err.into());
            }
        };

        let event = self.tracker.observe(packet.sequence);
        self.stats.accepted += 1;
        self.stats.per_state[packet.state.code() as usize] += 1;

        match event {
            SequenceEvent::Duplicate | SequenceEvent::Late => {}
            _ => {
                if let Some(previous) = self.last_arrival {
                    self.intervals.record(received_at_ms.saturating_sub(previous));
                }
                self.last_arrival = Some(received_at_ms);

                if self.last_state.is_some_and(|s| s != packet.state) {
                    self.stats.state_changes += 1;
                }
                self.last_state = Some(packet.state);
            }
        }

        if let SequenceEvent::Gap { lost } = event {
            debug!("Sequence gap before {}: {} packets lost", packet.sequence, lost);
        }

        Ok(StatusRecord::from_packet(&packet, received_at_ms, event))
    }

    /// Decode one payload given as manufacturer-data hex text
    pub fn ingest_hex(&mut self, text: &str, received_at_ms: u64) -> ReceiverResult<StatusRecord> {
        let bytes = parse_hex(text).inspect_err(|_| self.stats.malformed += 1)?;
        self.ingest(&bytes, received_at_ms)
    }

    /// Convert a scan log into JSON lines
    ///
    /// Each input line is `<received_at_ms>,<hex>`; blank lines and lines
    /// starting with `#` are skipped. Lines that fail to parse or decode are
    /// counted as malformed and skipped. Returns the number of records written.
    pub fn process_stream<R: BufRead, W: Write>(&mut self, input: R, mut output: W) -> ReceiverResult<usize> {
        let mut written = 0;
        for (number, line) in input.lines().enumerate() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            match self.parse_line(line) {
                Ok(record) => {
                    writeln!(output, "{}", record.to_json_line()?)?;
                    written += 1;
                }
                Err(err) => warn!("Skipping line {}: {}", number + 1, err),
            }
        }
        output.flush()?;
        Ok(written)
    }

    fn parse_line(&mut self, line: &str) -> ReceiverResult<StatusRecord> {
        let Some((stamp, hex)) = line.split_once(',') else {
            return Err(self.malformed_line("expected <received_at_ms>,<hex>"));
        };
        let Ok(received_at_ms) = stamp.trim().parse::<u64>() else {
            return Err(self.malformed_line("receive timestamp is not an integer"));
        };
        self.ingest_hex(hex, received_at_ms)
    }

    fn malformed_line(&mut self, reason: &'static str) -> ReceiverError {
        self.stats.malformed += 1;
        ReceiverError::Line { reason }
    }

    /// Ingestion counters
    pub fn stats(&self) -> ReceiverStats {
        self.stats
    }

    /// Sequence bookkeeping
    pub fn tracker(&self) -> &SequenceTracker {
        &self.tracker
    }

    /// Inter-arrival collector
    pub fn intervals(&self) -> &IntervalStats {
        &self.intervals
    }

    /// Link report so far
    pub fn summary(&self) -> LinkSummary {
        LinkSummary {
            stats: self.stats,
            lost: self.tracker.lost(),
            duplicates: self.tracker.duplicates(),
            late: self.tracker.late(),
            delivery_ratio: self.tracker.delivery_ratio(),
            intervals: self.intervals.summary(),
            interval_outliers: self.intervals.outliers(),
        }
    }
}
