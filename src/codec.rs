//! Record codec
//!
//! Encoding and decoding of single frames.
//!
//! ## Frame Format
//! ```text
//! ┌────────────┬────────────┬──────────────────────┬─────────────┐
//! │ Len (8)    │ LenCRC (4) │ Payload (Len bytes)  │ DataCRC (4) │
//! └────────────┴────────────┴──────────────────────┴─────────────┘
//! ```
//! - Len: u64 little-endian payload length
//! - LenCRC: masked CRC-32C of the 8 length bytes, u32 little-endian
//! - DataCRC: masked CRC-32C of the payload, u32 little-endian
//!
//! A stream is a plain concatenation of frames with no header or trailer.

use std::io::{self, Read};

use bytes::{BufMut, Bytes, BytesMut};

use crate::checksum;
use crate::error::{FrameField, Result, TfRecordError};

/// Size of the length prefix
pub const LENGTH_SIZE: usize = 8;

/// Size of each masked checksum
pub const CRC_SIZE: usize = 4;

/// Length prefix + length checksum
pub const HEADER_SIZE: usize = LENGTH_SIZE + CRC_SIZE;

/// Bytes added to every payload on disk
pub const FRAME_OVERHEAD: usize = HEADER_SIZE + CRC_SIZE;

/// Upper bound on payload bytes reserved up front from an untrusted length
const MAX_PREALLOC: u64 = 16 * 1024 * 1024;

// =============================================================================
// Encoding
// =============================================================================

/// On-disk size of a frame carrying `payload_len` bytes
#[inline]
pub fn encoded_len(payload_len: usize) -> usize {
    FRAME_OVERHEAD + payload_len
}

/// Append one encoded frame to `out`
pub fn encode_into<B: BufMut>(payload: &[u8], out: &mut B) {
    let length_bytes = (payload.len() as u64).to_le_bytes();

    out.put_slice(&length_bytes);
    out.put_u32_le(checksum::masked_crc(&length_bytes));
    out.put_slice(payload);
    out.put_u32_le(checksum::masked_crc(payload));
}

/// Encode one frame into a fresh buffer
pub fn encode(payload: &[u8]) -> Bytes {
    let mut out = BytesMut::with_capacity(encoded_len(payload.len()));
    encode_into(payload, &mut out);
    out.freeze()
}

// =============================================================================
// Decoding
// =============================================================================

/// Decode the frame at the start of `bytes`
///
/// Returns the payload and the number of bytes the frame occupied, or `None`
/// when `bytes` is empty. Offsets in errors are relative to `bytes`.
pub fn decode_slice(bytes: &[u8], verify: bool) -> Result<Option<(&[u8], usize)>> {
    if bytes.is_empty() {
        return Ok(None);
    }

    if bytes.len() < HEADER_SIZE {
        return Err(TfRecordError::Truncated {
            offset: 0,
            needed: HEADER_SIZE as u64,
            available: bytes.len() as u64,
        });
    }

    let mut header = [0u8; HEADER_SIZE];
    header.copy_from_slice(&bytes[..HEADER_SIZE]);
    let length = parse_header(&header, 0, verify)?;

    let needed = frame_len(length);
    if (bytes.len() as u64) < needed {
        return Err(TfRecordError::Truncated {
            offset: 0,
            needed,
            available: bytes.len() as u64,
        });
    }

    // needed fits in the slice, so length fits in usize
    let payload_end = HEADER_SIZE + length as usize;
    let payload = &bytes[HEADER_SIZE..payload_end];
    let stored = read_u32_le(&bytes[payload_end..payload_end + CRC_SIZE]);
    check_payload(payload, stored, 0, verify)?;

    Ok(Some((payload, payload_end + CRC_SIZE)))
}

/// Read one frame from `source` into `payload`
///
/// `offset` is the stream position of the frame start and is only used for
/// error reporting. Returns the frame size in bytes, or `None` if the source
/// was exhausted before the first header byte (clean end of stream).
pub fn read_frame<R: Read>(
    source: &mut R,
    offset: u64,
    verify: bool,
    payload: &mut Vec<u8>,
) -> Result<Option<u64>> {
    let mut header = [0u8; HEADER_SIZE];
    let got = read_full(source, &mut header)?;
    if got == 0 {
        return Ok(None);
    }
    if got < HEADER_SIZE {
        return Err(TfRecordError::Truncated {
            offset,
            needed: HEADER_SIZE as u64,
            available: got as u64,
        });
    }

    let length = parse_header(&header, offset, verify)?;

    // Grow incrementally past MAX_PREALLOC so a corrupt length cannot force a
    // huge allocation before the short read is detected.
    payload.clear();
    payload.reserve(length.min(MAX_PREALLOC) as usize);
    let got = source.by_ref().take(length).read_to_end(payload)? as u64;
    if got < length {
        return Err(TfRecordError::Truncated {
            offset,
            needed: frame_len(length),
            available: HEADER_SIZE as u64 + got,
        });
    }

    let mut crc = [0u8; CRC_SIZE];
    let got = read_full(source, &mut crc)?;
    if got < CRC_SIZE {
        return Err(TfRecordError::Truncated {
            offset,
            needed: frame_len(length),
            available: HEADER_SIZE as u64 + length + got as u64,
        });
    }
    check_payload(payload, u32::from_le_bytes(crc), offset, verify)?;

    Ok(Some(frame_len(length)))
}

// =============================================================================
// Shared helpers
// =============================================================================

/// Validate the length checksum (if asked) and return the payload length
fn parse_header(header: &[u8; HEADER_SIZE], offset: u64, verify: bool) -> Result<u64> {
    let mut length_bytes = [0u8; LENGTH_SIZE];
    length_bytes.copy_from_slice(&header[..LENGTH_SIZE]);

    if verify {
        let stored = read_u32_le(&header[LENGTH_SIZE..]);
        let actual = checksum::masked_crc(&length_bytes);
        if stored != actual {
            return Err(TfRecordError::ChecksumMismatch {
                offset,
                field: FrameField::Length,
                expected: stored,
                actual,
            });
        }
    }

    Ok(u64::from_le_bytes(length_bytes))
}

fn check_payload(payload: &[u8], stored: u32, offset: u64, verify: bool) -> Result<()> {
    if !verify {
        return Ok(());
    }
    let actual = checksum::masked_crc(payload);
    if stored != actual {
        return Err(TfRecordError::ChecksumMismatch {
            offset,
            field: FrameField::Payload,
            expected: stored,
            actual,
        });
    }
    Ok(())
}

#[inline]
fn frame_len(length: u64) -> u64 {
    length.saturating_add(FRAME_OVERHEAD as u64)
}

#[inline]
fn read_u32_le(bytes: &[u8]) -> u32 {
    u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

/// Like `read_exact`, but reports how many bytes arrived before EOF
fn read_full<R: Read>(source: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match source.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
