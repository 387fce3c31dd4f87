//! Manufacturer-data hex parsing
//!
//! Scanners report manufacturer data as hex text in a handful of shapes:
//! `0x0101...`, `01 01 ...`, or upper case with line breaks. All of them
//! are accepted.

use crate::error::{ReceiverError, ReceiverResult};

/// Parse a hex string into bytes
///
/// An optional `0x`/`0X` prefix is stripped and ASCII whitespace anywhere in
/// the string is ignored.
pub fn parse_hex(text: &str) -> ReceiverResult<Vec<u8>> {
    let trimmed = text.trim_start();
    let body = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);

    let digits: Vec<u8> = body.bytes().filter(|b| !b.is_ascii_whitespace()).collect();
    if digits.len() % 2 != 0 {
        return Err(ReceiverError::Hex {
            offset: digits.len(),
            reason: "odd number of hex digits",
        });
    }

    digits
        .chunks_exact(2)
        .enumerate()
        .map(|(i, pair)| {
            let hi = nibble(pair[0]).ok_or(ReceiverError::Hex {
                offset: i * 2,
                reason: "not a hex digit",
            })?;
            let lo = nibble(pair[1]).ok_or(ReceiverError::Hex {
                offset: i * 2 + 1,
                reason: "not a hex digit",
            })?;
            Ok((hi << 4) | lo)
        })
        .collect()
}

fn nibble(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}
