//! Status Packet Codec
//!
//! ## Wire Format
//!
//! Every broadcast carries one fixed-length, little-endian record in the
//! manufacturer-specific data of a non-connectable advertisement:
//!
//! ```text
//! Offset  Width  Field
//! ──────  ─────  ─────────────────────────────────────────────
//!    0      1    format version (0x01)
//!    1      1    sequence, wraps modulo 256
//!    2      1    state: 0 Quiet, 1 Uncertain, 2 Active
//!    3      1    uncertainty_q8 = round(uncertainty · 255)
//!    4      1    battery percent, clamped to 100
//!    5      4    device timestamp, ms (u32, truncated)
//!    9      2    advertising interval on air, ms (u16, saturating)
//!   11      6    last accelerometer sample, milli-g (3 × i16)
//!   17      4    reserved: zero on encode, ignored on decode
//! ──────
//!   21 bytes
//! ```
//!
//! Uncertainty travels as one fixed-point byte, never as a float; the decoder
//! reproduces it within 1/255.
//!
//! The decoder rejects a buffer of any other length, an unknown version byte,
//! or an unknown state byte. It never parses a partial record.

use crate::constants::MAX_ADV_PAYLOAD_LEN;
use crate::errors::DecodeError;
use crate::state::ActivityState;

/// Fixed payload length (bytes)
pub const PACKET_LEN: usize = 21;

const _: () = assert!(PACKET_LEN <= MAX_ADV_PAYLOAD_LEN);

/// Current format version byte
pub const FORMAT_VERSION: u8 = 0x01;

const OFFSET_VERSION: usize = 0;
const OFFSET_SEQUENCE: usize = 1;
const OFFSET_STATE: usize = 2;
const OFFSET_UNCERTAINTY: usize = 3;
const OFFSET_BATTERY: usize = 4;
const OFFSET_TIMESTAMP: usize = 5;
const OFFSET_INTERVAL: usize = 9;
const OFFSET_ACCEL: usize = 11;

/// Quantize an uncertainty in `[0, 1]` to one byte
pub fn quantize_uncertainty(uncertainty: f32) -> u8 {
    if !uncertainty.is_finite() {
        return 0;
    }
    libm::roundf(uncertainty.clamp(0.0, 1.0) * 255.0) as u8
}

/// Inverse of [`quantize_uncertainty`]
pub fn dequantize_uncertainty(q8: u8) -> f32 {
    q8 as f32 / 255.0
}

/// One status broadcast
///
/// Built fresh for every broadcast and not retained after transmission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StatusPacket {
    /// Sequence number (mod 256)
    pub sequence: u8,
    /// Activity state at encode time
    pub state: ActivityState,
    /// Quantized uncertainty
    pub uncertainty_q8: u8,
    /// Battery level, percent
    pub battery_pct: u8,
    /// Device-local timestamp, ms
    pub timestamp_ms: u32,
    /// Advertising interval on air, ms
    pub interval_ms: u16,
    /// Last accelerometer sample, milli-g
    pub accel_milli_g: [i16; 3],
}

impl StatusPacket {
    /// Build a packet, applying the wire quantization and truncation rules
    pub fn new(
        sequence: u8,
        state: ActivityState,
        uncertainty: f32,
        battery_pct: u8,
        timestamp_ms: u64,
        interval_ms: u32,
    ) -> Self {
        Self {
            sequence,
            state,
            uncertainty_q8: quantize_uncertainty(uncertainty),
            battery_pct: battery_pct.min(100),
            timestamp_ms: timestamp_ms as u32,
            interval_ms: interval_ms.min(u16::MAX as u32) as u16,
            accel_milli_g: [0; 3],
        }
    }

    /// Attach the last accelerometer sample
    pub fn with_accel(mut self, accel_milli_g: [i16; 3]) -> Self {
        self.accel_milli_g = accel_milli_g;
        self
    }

    /// Uncertainty reconstructed from the quantized byte
    pub fn uncertainty(&self) -> f32 {
        dequantize_uncertainty(self.uncertainty_q8)
    }

    /// Encode into a fresh array
    pub fn encode(&self) -> [u8; PACKET_LEN] {
        let mut out = [0u8; PACKET_LEN];
        self.write(&mut out);
        out
    }

    /// Encode into a caller buffer; returns the bytes written
    ///
    /// Returns `None` when the buffer is shorter than [`PACKET_LEN`].
    pub fn encode_into(&self, buf: &mut [u8]) -> Option<usize> {
        let out: &mut [u8; PACKET_LEN] = buf.get_mut(..PACKET_LEN)?.try_into().ok()?;
        self.write(out);
        Some(PACKET_LEN)
    }

    fn write(&self, out: &mut [u8; PACKET_LEN]) {
        out.fill(0);
        out[OFFSET_VERSION] = FORMAT_VERSION;
        out[OFFSET_SEQUENCE] = self.sequence;
        out[OFFSET_STATE] = self.state.code();
        out[OFFSET_UNCERTAINTY] = self.uncertainty_q8;
        out[OFFSET_BATTERY] = self.battery_pct.min(100);
        out[OFFSET_TIMESTAMP..OFFSET_TIMESTAMP + 4].copy_from_slice(&self.timestamp_ms.to_le_bytes());
        out[OFFSET_INTERVAL..OFFSET_INTERVAL + 2].copy_from_slice(&self.interval_ms.to_le_bytes());
        for (axis, value) in self.accel_milli_g.iter().enumerate() {
            let at = OFFSET_ACCEL + axis * 2;
            out[at..at + 2].copy_from_slice(&value.to_le_bytes());
        }
    }

    /// Parse a received payload
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        if bytes.len() != PACKET_LEN {
            return Err(DecodeError::WrongLength {
                expected: PACKET_LEN,
                actual: bytes.len(),
            });
        }

        let version = bytes[OFFSET_VERSION];
        if version != FORMAT_VERSION {
            return Err(DecodeError::UnknownVersion(version));
        }

        let state_code = bytes[OFFSET_STATE];
        let state = ActivityState::from_code(state_code).ok_or(DecodeError::UnknownState(state_code))?;

        let timestamp_ms = u32::from_le_bytes([
            bytes[OFFSET_TIMESTAMP],
            bytes[OFFSET_TIMESTAMP + 1],
            bytes[OFFSET_TIMESTAMP + 2],
            bytes[OFFSET_TIMESTAMP + 3],
        ]);
        let interval_ms = u16::from_le_bytes([bytes[OFFSET_INTERVAL], bytes[OFFSET_INTERVAL + 1]]);

        let mut accel_milli_g = [0i16; 3];
        for (axis, value) in accel_milli_g.iter_mut().enumerate() {
            let at = OFFSET_ACCEL + axis * 2;
            *value = i16::from_le_bytes([bytes[at], bytes[at + 1]]);
        }

        Ok(Self {
            sequence: bytes[OFFSET_SEQUENCE],
            state,
            uncertainty_q8: bytes[OFFSET_UNCERTAINTY],
            battery_pct: bytes[OFFSET_BATTERY],
            timestamp_ms,
            interval_ms,
            accel_milli_g,
        })
    }
}

/// Broadcast sequence number
///
/// Wraps 255 → 0 and never resets while the device runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SequenceCounter {
    next: u8,
}

impl SequenceCounter {
    /// Counter starting at zero
    pub const fn new() -> Self {
        Self { next: 0 }
    }

    /// Take the next sequence number
    pub fn next(&mut self) -> u8 {
        let seq = self.next;
        self.next = self.next.wrapping_add(1);
        seq
    }

    /// Value the next call to [`Self::next`] will return
    pub fn peek(&self) -> u8 {
        self.next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_packet() -> StatusPacket {
        StatusPacket::new(42, ActivityState::Active, 0.5, 87, 123_456, 100).with_accel([12, -980, 31])
    }

    #[test]
    fn layout_is_bit_exact() {
        let bytes = sample_packet().encode();

        assert_eq!(bytes.len(), PACKET_LEN);
        assert_eq!(bytes[0], 0x01);
        assert_eq!(bytes[1], 42);
        assert_eq!(bytes[2], 2);
        assert_eq!(bytes[3], 128); // round(0.5 * 255) = round(127.5)
        assert_eq!(bytes[4], 87);
        assert_eq!(&bytes[5..9], &123_456u32.to_le_bytes());
        assert_eq!(&bytes[9..11], &[100, 0]);
        assert_eq!(&bytes[11..13], &12i16.to_le_bytes());
        assert_eq!(&bytes[13..15], &(-980i16).to_le_bytes());
        assert_eq!(&bytes[17..21], &[0, 0, 0, 0]);
    }

    #[test]
    fn decode_reproduces_fields() {
        let packet = sample_packet();
        let decoded = StatusPacket::decode(&packet.encode()).unwrap();

        assert_eq!(decoded, packet);
        assert!((decoded.uncertainty() - 0.5).abs() <= 1.0 / 255.0);
    }

    #[test]
    fn quantization_endpoints() {
        assert_eq!(quantize_uncertainty(0.0), 0);
        assert_eq!(quantize_uncertainty(1.0), 255);
        assert_eq!(quantize_uncertainty(1.5), 255);
        assert_eq!(quantize_uncertainty(-0.1), 0);
        assert_eq!(quantize_uncertainty(f32::NAN), 0);
        assert_eq!(dequantize_uncertainty(255), 1.0);
    }

    #[test]
    fn encode_clamps_and_truncates() {
        let packet = StatusPacket::new(0, ActivityState::Quiet, 0.0, 250, (1u64 << 32) + 7, 100_000);
        assert_eq!(packet.battery_pct, 100);
        assert_eq!(packet.timestamp_ms, 7);
        assert_eq!(packet.interval_ms, u16::MAX);
    }

    #[test]
    fn rejects_wrong_length() {
        let bytes = sample_packet().encode();
        assert_eq!(
            StatusPacket::decode(&bytes[..20]),
            Err(DecodeError::WrongLength { expected: 21, actual: 20 })
        );

        let mut long = [0u8; 22];
        long[..21].copy_from_slice(&bytes);
        assert!(matches!(StatusPacket::decode(&long), Err(DecodeError::WrongLength { .. })));
        assert!(matches!(StatusPacket::decode(&[]), Err(DecodeError::WrongLength { .. })));
    }

    #[test]
    fn rejects_unknown_version_and_state() {
        let mut bytes = sample_packet().encode();
        bytes[0] = 0x02;
        assert_eq!(StatusPacket::decode(&bytes), Err(DecodeError::UnknownVersion(0x02)));

        let mut bytes = sample_packet().encode();
        bytes[2] = 3;
        assert_eq!(StatusPacket::decode(&bytes), Err(DecodeError::UnknownState(3)));
    }

    #[test]
    fn reserved_bytes_are_ignored() {
        let mut bytes = sample_packet().encode();
        bytes[17..21].copy_from_slice(&[0xde, 0xad, 0xbe, 0xef]);
        assert_eq!(StatusPacket::decode(&bytes).unwrap(), sample_packet());
    }

    #[test]
    fn encode_into_requires_room() {
        let mut small = [0u8; 10];
        assert_eq!(sample_packet().encode_into(&mut small), None);

        let mut buf = [0xffu8; 24];
        assert_eq!(sample_packet().encode_into(&mut buf), Some(PACKET_LEN));
        assert_eq!(&buf[..PACKET_LEN], &sample_packet().encode());
        assert_eq!(&buf[PACKET_LEN..], &[0xff, 0xff, 0xff]);
    }

    #[test]
    fn sequence_wraps() {
        let mut seq = SequenceCounter::new();
        for expected in 0..=255u8 {
            assert_eq!(seq.next(), expected);
        }
        assert_eq!(seq.next(), 0);
        assert_eq!(seq.peek(), 1);
    }

    #[test]
    fn packet_fits_advertising_payload() {
        let mut adv = [0xAAu8; MAX_ADV_PAYLOAD_LEN];
        assert_eq!(sample_packet().encode_into(&mut adv), Some(PACKET_LEN));
        assert!(adv[PACKET_LEN..].iter().all(|&b| b == 0xAA));
    }
}
