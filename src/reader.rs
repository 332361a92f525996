//! Sequential record reader
//!
//! Forward-only, single-pass decoding of a frame stream.
//!
//! ## States
//! ```text
//!   Open ──(clean EOF)──▶ Exhausted
//!     │
//!     └──(truncation, checksum mismatch, I/O error)──▶ Failed
//! ```
//! A failed reader never resynchronizes; later reads return `InvalidState`.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use bytes::Bytes;
use tracing::debug;

use crate::codec;
use crate::config::Config;
use crate::error::{Result, TfRecordError};
use crate::payload::PayloadCodec;

/// Read buffer used when opening files by path
const FILE_READ_BUFFER: usize = 64 * 1024;

/// Anything that yields records one at a time
pub trait RecordSource {
    /// Next record, or `None` at clean end of stream
    fn read_next(&mut self) -> Result<Option<Bytes>>;

    /// Iterate over the remaining records
    fn records(self) -> Records<Self>
    where
        Self: Sized,
    {
        Records {
            source: self,
            done: false,
        }
    }
}

/// Lifecycle of a [`RecordReader`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderState {
    Open,
    /// Clean end of stream reached at a frame boundary
    Exhausted,
    /// A fatal error was returned; the stream position is no longer trusted
    Failed,
}

/// Reads framed records from a source
pub struct RecordReader<R: Read> {
    source: R,
    check_integrity: bool,
    /// Stream offset of the next frame
    offset: u64,
    records_read: u64,
    state: ReaderState,
    /// Reused payload buffer for `read_next_ref`
    buffer: Vec<u8>,
}

impl RecordReader<BufReader<File>> {
    /// Open a file for reading
    pub fn open(path: &Path, check_integrity: bool) -> Result<Self> {
        let file = File::open(path)?;
        debug!(path = %path.display(), check_integrity, "opened record reader");
        Ok(Self::new(
            BufReader::with_capacity(FILE_READ_BUFFER, file),
            check_integrity,
        ))
    }

    /// Open a file using `config.check_integrity`
    pub fn open_with_config(path: &Path, config: &Config) -> Result<Self> {
        Self::open(path, config.check_integrity)
    }
}

impl<R: Read> RecordReader<R> {
    /// Wrap an arbitrary source positioned at a frame boundary
    pub fn new(source: R, check_integrity: bool) -> Self {
        Self {
            source,
            check_integrity,
            offset: 0,
            records_read: 0,
            state: ReaderState::Open,
            buffer: Vec::new(),
        }
    }

    /// Wrap a source using `config.check_integrity`
    pub fn with_config(source: R, config: &Config) -> Self {
        Self::new(source, config.check_integrity)
    }

    // =========================================================================
    // Reading
    // =========================================================================

    /// Decode the next frame into `buf`
    ///
    /// Returns `false` at clean end of stream. `buf` is overwritten with the
    /// payload on success and left unspecified on error.
    pub fn read_into(&mut self, buf: &mut Vec<u8>) -> Result<bool> {
        match self.state {
            ReaderState::Open => {}
            ReaderState::Exhausted => return Ok(false),
            ReaderState::Failed => {
                return Err(TfRecordError::InvalidState(format!(
                    "reader stopped at offset {} after a fatal error",
                    self.offset
                )))
            }
        }

        match codec::read_frame(&mut self.source, self.offset, self.check_integrity, buf) {
            Ok(Some(frame_len)) => {
                self.offset += frame_len;
                self.records_read += 1;
                Ok(true)
            }
            Ok(None) => {
                self.state = ReaderState::Exhausted;
                debug!(
                    records = self.records_read,
                    bytes = self.offset,
                    "record stream exhausted"
                );
                Ok(false)
            }
            Err(e) => {
                self.state = ReaderState::Failed;
                Err(e)
            }
        }
    }

    /// Next record borrowed from an internal buffer
    ///
    /// The slice is valid until the next call on this reader.
    pub fn read_next_ref(&mut self) -> Result<Option<&[u8]>> {
        let mut buffer = std::mem::take(&mut self.buffer);
        let found = self.read_into(&mut buffer);
        self.buffer = buffer;

        if found? {
            Ok(Some(self.buffer.as_slice()))
        } else {
            Ok(None)
        }
    }

    /// Next record decoded through `codec`
    pub fn read_item<C: PayloadCodec>(&mut self, codec: &C) -> Result<Option<C::Item>> {
        match self.read_next_ref()? {
            Some(payload) => Ok(Some(codec.decode(payload)?)),
            None => Ok(None),
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Stream offset of the next frame (bytes consumed by complete frames)
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Number of complete frames returned so far
    pub fn records_read(&self) -> u64 {
        self.records_read
    }

    /// Current lifecycle state
    pub fn state(&self) -> ReaderState {
        self.state
    }

    /// True once a clean end of stream has been seen
    pub fn is_exhausted(&self) -> bool {
        self.state == ReaderState::Exhausted
    }

    /// Whether checksums are verified on read
    pub fn check_integrity(&self) -> bool {
        self.check_integrity
    }

    /// Borrow the underlying source
    pub fn get_ref(&self) -> &R {
        &self.source
    }

    /// Unwrap the underlying source, positioned wherever reading stopped
    pub fn into_inner(self) -> R {
        self.source
    }
}

impl<R: Read> RecordSource for RecordReader<R> {
    fn read_next(&mut self) -> Result<Option<Bytes>> {
        let mut payload = Vec::new();
        if self.read_into(&mut payload)? {
            Ok(Some(Bytes::from(payload)))
        } else {
            Ok(None)
        }
    }
}

/// Iterator over records from a [`RecordSource`]
///
/// Yields at most one error, then ends.
pub struct Records<S> {
    source: S,
    done: bool,
}

impl<S> Records<S> {
    /// Recover the wrapped record source
    pub fn into_inner(self) -> S {
        self.source
    }
}

impl<S: RecordSource> Iterator for Records<S> {
    type Item = Result<Bytes>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        match self.source.read_next() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
