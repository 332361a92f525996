//! # tfrecord-fast
//!
//! Reader and writer for the TFRecord container format:
//! - Length-prefixed frames protected by masked CRC-32C checksums
//! - Size-triggered buffered writer
//! - Forward-only reader with optional checksum verification
//! - Bounded shuffle buffer for randomized read order
//!
//! ## Architecture Overview
//!
//! ```text
//!   RecordWriter ──▶ codec::encode_into ──▶ checksum ──▶ sink
//!
//!   source ──▶ RecordReader ──▶ codec::read_frame ──▶ checksum
//!                   │
//!                   ▼
//!            ShuffleReader (optional) ──▶ caller
//! ```
//!
//! Typed payloads go through a [`PayloadCodec`] layered on top; the frame
//! layer only ever sees bytes.

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod checksum;
pub mod codec;
pub mod writer;
pub mod reader;
pub mod shuffle;
pub mod payload;
pub mod scan;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{FrameField, Result, TfRecordError};
pub use config::Config;
pub use writer::RecordWriter;
pub use reader::{ReaderState, RecordReader, RecordSource, Records};
pub use shuffle::ShuffleReader;
pub use payload::{Feature, FeatureCodec, FeatureSet, PayloadCodec, RawCodec};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of tfrecord-fast
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
