//! Configuration for tfrecord-fast
//!
//! Centralized configuration with sensible defaults.

use crate::error::{Result, TfRecordError};

/// Default writer buffer capacity (8 KiB)
pub const DEFAULT_WRITER_BUFFER_SIZE: usize = 8 * 1024;

/// Reader and writer configuration
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Writer Configuration
    // -------------------------------------------------------------------------
    /// Bytes buffered before an automatic flush to the sink.
    /// Checked after each append, so one oversized record still buffers whole.
    pub writer_buffer_size: usize,

    // -------------------------------------------------------------------------
    // Reader Configuration
    // -------------------------------------------------------------------------
    /// Verify length and payload checksums on every frame
    pub check_integrity: bool,

    // -------------------------------------------------------------------------
    // Shuffle Configuration
    // -------------------------------------------------------------------------
    /// Number of records pooled for shuffled reads (0 disables shuffling)
    pub shuffle_buffer_size: usize,

    /// Seed for the shuffle RNG; `None` seeds from OS entropy
    pub shuffle_seed: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            writer_buffer_size: DEFAULT_WRITER_BUFFER_SIZE,
            check_integrity: true,
            shuffle_buffer_size: 0,
            shuffle_seed: None,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Reject settings no reader or writer can honor
    pub fn validate(&self) -> Result<()> {
        if self.writer_buffer_size == 0 {
            return Err(TfRecordError::Config(
                "writer_buffer_size must be at least 1 byte".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the writer buffer capacity (in bytes)
    pub fn writer_buffer_size(mut self, size: usize) -> Self {
        self.config.writer_buffer_size = size;
        self
    }

    /// Enable or disable checksum verification on read
    pub fn check_integrity(mut self, enabled: bool) -> Self {
        self.config.check_integrity = enabled;
        self
    }

    /// Set the shuffle pool capacity (in records)
    pub fn shuffle_buffer_size(mut self, records: usize) -> Self {
        self.config.shuffle_buffer_size = records;
        self
    }

    /// Seed the shuffle RNG for reproducible read order
    pub fn shuffle_seed(mut self, seed: u64) -> Self {
        self.config.shuffle_seed = Some(seed);
        self
    }

    /// Finish building
    pub fn build(self) -> Config {
        self.config
    }
}
