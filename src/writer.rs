//! Buffered record writer
//!
//! Encodes records into an in-memory buffer and hands the buffer to the sink
//! once it reaches the configured capacity.
//!
//! ## Lifecycle
//! ```text
//!   new/create ──▶ Open ──(write | flush)──▶ Open ──close──▶ Closed
//! ```
//! Every operation on a closed writer fails with `InvalidState`.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;

use bytes::BytesMut;
use tracing::{debug, trace, warn};

use crate::codec;
use crate::config::Config;
use crate::error::{Result, TfRecordError};
use crate::payload::PayloadCodec;

/// Writes framed records to a sink through a size-triggered buffer
///
/// Not safe for concurrent use; one writer owns its sink exclusively until
/// `close()` drops it.
pub struct RecordWriter<W: Write> {
    /// Output sink (None once closed)
    sink: Option<W>,
    /// Encoded frames not yet handed to the sink
    buffer: BytesMut,
    /// Flush threshold in bytes, checked after each append
    capacity: usize,
    /// Records accepted by `write`
    records_written: u64,
    /// Bytes successfully handed to the sink
    bytes_written: u64,
}

impl RecordWriter<File> {
    /// Create (or truncate) a file and write records to it
    pub fn create(path: &Path, capacity: usize) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;

        debug!(path = %path.display(), capacity, "opened record writer");
        Self::new(file, capacity)
    }

    /// Create a file writer using `config.writer_buffer_size`
    pub fn create_with_config(path: &Path, config: &Config) -> Result<Self> {
        config.validate()?;
        Self::create(path, config.writer_buffer_size)
    }

    /// Flush buffered records and fsync the file
    pub fn sync_all(&mut self) -> Result<()> {
        self.flush()?;
        self.sink_mut()?.sync_all()?;
        Ok(())
    }
}

impl<W: Write> RecordWriter<W> {
    /// Wrap an arbitrary sink
    ///
    /// `capacity` is the flush threshold in bytes and must be at least 1.
    pub fn new(sink: W, capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(TfRecordError::Config(
                "writer buffer capacity must be at least 1 byte".to_string(),
            ));
        }

        Ok(Self {
            sink: Some(sink),
            buffer: BytesMut::with_capacity(capacity),
            capacity,
            records_written: 0,
            bytes_written: 0,
        })
    }

    /// Wrap a sink using `config.writer_buffer_size`
    pub fn with_config(sink: W, config: &Config) -> Result<Self> {
        config.validate()?;
        Self::new(sink, config.writer_buffer_size)
    }

    // =========================================================================
    // Writing
    // =========================================================================

    /// Append one record
    ///
    /// Performs at most one sink write: when the buffer reaches capacity after
    /// the append, the whole buffer is written. On sink failure the buffered
    /// bytes are discarded, not retried.
    pub fn write(&mut self, payload: &[u8]) -> Result<()> {
        self.ensure_open()?;

        codec::encode_into(payload, &mut self.buffer);

        if self.buffer.len() >= self.capacity {
            self.write_buffer()?;
        }

        self.records_written += 1;
        Ok(())
    }

    /// Encode `item` with `codec` and append it as one record
    pub fn write_item<C: PayloadCodec>(&mut self, codec: &C, item: &C::Item) -> Result<()> {
        let payload = codec.encode(item)?;
        self.write(&payload)
    }

    /// Hand any buffered bytes to the sink and flush it
    ///
    /// No-op when nothing is buffered. The buffer is cleared even if the sink
    /// fails, so a retried flush never writes the same frames twice.
    pub fn flush(&mut self) -> Result<()> {
        self.ensure_open()?;

        if self.buffer.is_empty() {
            return Ok(());
        }

        self.write_buffer()?;
        self.sink_mut()?.flush()?;
        Ok(())
    }

    /// Flush and release the sink
    ///
    /// The writer is closed even if the final flush fails.
    pub fn close(&mut self) -> Result<()> {
        self.ensure_open()?;

        let result = self.flush();
        self.sink = None;

        debug!(
            records = self.records_written,
            bytes = self.bytes_written,
            "closed record writer"
        );
        result
    }

    /// Flush and return the sink, closing the writer
    pub fn into_inner(mut self) -> Result<W> {
        self.flush()?;
        self.sink.take().ok_or_else(closed_error)
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Number of records accepted by `write`
    pub fn records_written(&self) -> u64 {
        self.records_written
    }

    /// Number of bytes handed to the sink so far
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Number of encoded bytes waiting in the buffer
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// Flush threshold in bytes
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// True once `close` has been called
    pub fn is_closed(&self) -> bool {
        self.sink.is_none()
    }

    /// Borrow the sink, if still open
    pub fn get_ref(&self) -> Option<&W> {
        self.sink.as_ref()
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn ensure_open(&self) -> Result<()> {
        if self.sink.is_none() {
            return Err(closed_error());
        }
        Ok(())
    }

    fn sink_mut(&mut self) -> Result<&mut W> {
        self.sink.as_mut().ok_or_else(closed_error)
    }

    /// Single sink write of the whole buffer; clears the buffer regardless
    fn write_buffer(&mut self) -> Result<()> {
        let len = self.buffer.len();
        let sink = self.sink.as_mut().ok_or_else(closed_error)?;
        let result = sink.write_all(&self.buffer);
        self.buffer.clear();
        result?;

        self.bytes_written += len as u64;
        trace!(bytes = len, total = self.bytes_written, "flushed writer buffer");
        Ok(())
    }
}

impl<W: Write> Drop for RecordWriter<W> {
    fn drop(&mut self) {
        if self.sink.is_none() || self.buffer.is_empty() {
            return;
        }
        if let Err(e) = self.flush() {
            warn!(error = %e, "failed to flush record writer on drop");
        }
    }
}

fn closed_error() -> TfRecordError {
    TfRecordError::InvalidState("record writer is closed".to_string())
}
