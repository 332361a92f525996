//! Error types for tfrecord-fast
//!
//! Provides a unified error type for all operations.

use std::fmt;

use thiserror::Error;

/// Result type alias using TfRecordError
pub type Result<T> = std::result::Result<T, TfRecordError>;

/// Which checksummed field of a frame failed verification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameField {
    /// The 8-byte little-endian length prefix
    Length,
    /// The record payload
    Payload,
}

impl fmt::Display for FrameField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameField::Length => f.write_str("length"),
            FrameField::Payload => f.write_str("payload"),
        }
    }
}

/// Unified error type for tfrecord-fast operations
///
/// Clean end of stream is not represented here: readers return `Ok(None)`.
#[derive(Debug, Error)]
pub enum TfRecordError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Stream Corruption
    // -------------------------------------------------------------------------
    /// Stream ended inside a frame
    #[error("Truncated frame at offset {offset}: needed {needed} bytes, got {available}")]
    Truncated {
        /// Offset of the frame that could not be completed
        offset: u64,
        needed: u64,
        available: u64,
    },

    #[error(
        "Checksum mismatch in {field} of frame at offset {offset}: \
         stored 0x{expected:08x}, computed 0x{actual:08x}"
    )]
    ChecksumMismatch {
        offset: u64,
        field: FrameField,
        expected: u32,
        actual: u32,
    },

    // -------------------------------------------------------------------------
    // API Contract Errors
    // -------------------------------------------------------------------------
    #[error("Invalid state: {0}")]
    InvalidState(String),

    // -------------------------------------------------------------------------
    // Payload Codec Errors
    // -------------------------------------------------------------------------
    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl TfRecordError {
    /// True for errors caused by malformed stream contents
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            TfRecordError::Truncated { .. } | TfRecordError::ChecksumMismatch { .. }
        )
    }
}
