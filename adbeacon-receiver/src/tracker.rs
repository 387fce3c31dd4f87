//! Sequence-gap tracking
//!
//! The node's sequence number is one byte and wraps from 255 to 0. Deltas are
//! taken modulo 256, so the wrap reads as an ordinary step of one. Deltas in
//! the upper half of the ring are treated as packets arriving late or out of
//! order rather than as 200-odd lost packets.

/// Largest forward step still read as loss; larger deltas are late arrivals
pub const MAX_FORWARD_GAP: u8 = 127;

/// How one sequence number relates to the previous one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceEvent {
    /// First packet seen
    First,
    /// Exactly the next number
    InOrder,
    /// Same number as the previous packet
    Duplicate,
    /// Skipped ahead; `lost` packets never arrived
    Gap {
        /// Packets missing between the previous and this one
        lost: u8,
    },
    /// Behind the previous packet (reordered or replayed)
    Late,
}

/// Running sequence bookkeeping for one node
#[derive(Debug, Clone, Default)]
pub struct SequenceTracker {
    last: Option<u8>,
    received: u64,
    lost: u64,
    duplicates: u64,
    late: u64,
}

impl SequenceTracker {
    /// Create an empty tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a sequence number and classify it
    ///
    /// Late packets do not move the reference point, so a single straggler
    /// cannot make the following in-order packets look like loss.
    pub fn observe(&mut self, sequence: u8) -> SequenceEvent {
        self.received += 1;

        let Some(last) = self.last else {
            self.last = Some(sequence);
            return SequenceEvent::First;
        };

        let delta = sequence.wrapping_sub(last);
        let event = match delta {
            0 => {
                self.duplicates += 1;
                SequenceEvent::Duplicate
            }
            1 => SequenceEvent::InOrder,
            2..=MAX_FORWARD_GAP => {
                let lost = delta - 1;
                self.lost += lost as u64;
                SequenceEvent::Gap { lost }
            }
            _ => {
                self.late += 1;
                return SequenceEvent::Late;
            }
        };

        self.last = Some(sequence);
        event
    }

    /// Last in-order sequence number
    pub fn last(&self) -> Option<u8> {
        self.last
    }

    /// Packets observed, including duplicates and late arrivals
    pub fn received(&self) -> u64 {
        self.received
    }

    /// Packets inferred lost from forward gaps
    pub fn lost(&self) -> u64 {
        self.lost
    }

    /// Repeated sequence numbers
    pub fn duplicates(&self) -> u64 {
        self.duplicates
    }

    /// Packets behind the reference point
    pub fn late(&self) -> u64 {
        self.late
    }

    /// Fraction of expected packets that arrived, in `[0, 1]`
    ///
    /// Returns `None` before any packet has been seen.
    pub fn delivery_ratio(&self) -> Option<f64> {
        let unique = self.received - self.duplicates - self.late;
        let expected = unique + self.lost;
        if expected == 0 {
            return None;
        }
        Some(unique as f64 / expected as f64)
    }
}
