//! Stream scanning
//!
//! Whole-stream integrity checks and frame indexing. Unlike the readers, a
//! scan reports corruption as data instead of failing on it.

use std::fs::File;
use std::io::{self, BufReader, Read, Write};
use std::path::Path;

use tracing::debug;

use crate::codec;
use crate::error::{FrameField, Result, TfRecordError};
use crate::reader::RecordReader;

/// How a scanned stream ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanOutcome {
    /// Last frame ended exactly at end of stream
    Clean,
    /// Stream ended inside the frame starting at `offset`
    Truncated { offset: u64 },
    /// Checksum mismatch in the frame starting at `offset`
    Corrupt { offset: u64, field: FrameField },
}

/// Result of scanning a stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanReport {
    /// Complete, valid frames before the first problem
    pub records: u64,
    /// Bytes covered by those frames
    pub valid_bytes: u64,
    /// Every byte in the stream, including any partial or corrupt tail
    pub total_bytes: u64,
    pub outcome: ScanOutcome,
}

impl ScanReport {
    pub fn is_clean(&self) -> bool {
        self.outcome == ScanOutcome::Clean
    }
}

/// Location of one frame within a stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexEntry {
    /// Offset of the frame's length field
    pub offset: u64,
    /// Full frame size including the 16 bytes of framing
    pub frame_len: u64,
}

impl IndexEntry {
    pub fn payload_len(&self) -> u64 {
        self.frame_len - codec::FRAME_OVERHEAD as u64
    }
}

/// Counts bytes passing through to the wrapped source
struct CountingReader<R> {
    inner: R,
    count: u64,
}

impl<R: Read> Read for CountingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.count += n as u64;
        Ok(n)
    }
}

/// Scan a stream, counting frames until end of stream or the first problem
///
/// The rest of the stream after a problem is read to measure its length.
/// Only I/O errors are returned as `Err`.
pub fn scan<R: Read>(source: R, check_integrity: bool) -> Result<ScanReport> {
    let counted = CountingReader { inner: source, count: 0 };
    let mut reader = RecordReader::new(counted, check_integrity);
    let mut payload = Vec::new();

    let outcome = loop {
        match reader.read_into(&mut payload) {
            Ok(true) => continue,
            Ok(false) => break ScanOutcome::Clean,
            Err(TfRecordError::Truncated { offset, .. }) => {
                break ScanOutcome::Truncated { offset }
            }
            Err(TfRecordError::ChecksumMismatch { offset, field, .. }) => {
                break ScanOutcome::Corrupt { offset, field }
            }
            Err(e) => return Err(e),
        }
    };

    let records = reader.records_read();
    let valid_bytes = reader.offset();
    let mut counted = reader.into_inner();
    io::copy(&mut counted, &mut io::sink())?;

    Ok(ScanReport {
        records,
        valid_bytes,
        total_bytes: counted.count,
        outcome,
    })
}

/// Scan a file on disk
pub fn verify_file(path: &Path, check_integrity: bool) -> Result<ScanReport> {
    let file = File::open(path)?;
    let report = scan(BufReader::new(file), check_integrity)?;
    debug!(
        path = %path.display(),
        records = report.records,
        total_bytes = report.total_bytes,
        outcome = ?report.outcome,
        "scanned record file"
    );
    Ok(report)
}

/// Locate every frame in a stream
///
/// Checksums are not verified. Fails on a truncated stream.
pub fn build_index<R: Read>(source: R) -> Result<Vec<IndexEntry>> {
    let mut reader = RecordReader::new(source, false);
    let mut payload = Vec::new();
    let mut index = Vec::new();

    loop {
        let offset = reader.offset();
        if !reader.read_into(&mut payload)? {
            break;
        }
        index.push(IndexEntry {
            offset,
            frame_len: reader.offset() - offset,
        });
    }

    Ok(index)
}

/// Index a file on disk
pub fn build_file_index(path: &Path) -> Result<Vec<IndexEntry>> {
    let file = File::open(path)?;
    build_index(BufReader::new(file))
}

/// Write an index as text, one `"{offset} {frame_len}"` line per frame
pub fn write_index<W: Write>(index: &[IndexEntry], out: &mut W) -> Result<()> {
    for entry in index {
        writeln!(out, "{} {}", entry.offset, entry.frame_len)?;
    }
    out.flush()?;
    Ok(())
}
