//! Receiver errors

use adbeacon_core::DecodeError;
use thiserror::Error;

/// Result alias for receiver operations
pub type ReceiverResult<T> = Result<T, ReceiverError>;

/// Everything that can go wrong between the scanner and a JSON line
#[derive(Debug, Error)]
pub enum ReceiverError {
    /// Bytes did not form a valid status packet
    #[error("Malformed packet: {0}")]
    Decode(#[from] DecodeError),

    /// Manufacturer-data string was not valid hex
    #[error("Invalid hex at offset {offset}: {reason}")]
    Hex {
        /// Character offset of the problem, after prefix and whitespace removal
        offset: usize,
        /// What was wrong
        reason: &'static str,
    },

    /// Scan-log line did not have the `<received_at_ms>,<hex>` shape
    #[error("Malformed scan-log line: {reason}")]
    Line {
        /// What was wrong
        reason: &'static str,
    },

    /// Record could not be (de)serialized
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Reading or writing a record stream failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
