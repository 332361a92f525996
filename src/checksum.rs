//! Masked CRC-32C
//!
//! Every checksum in a TFRecord stream is a CRC-32C (Castagnoli) value passed
//! through a fixed rotate-and-add mask. The same function covers the length
//! prefix and the payload; encode and decode both go through [`masked_crc`].

/// Right-rotation applied to the raw CRC before adding [`MASK_DELTA`]
pub const MASK_ROTATION: u32 = 15;

/// Constant added (mod 2^32) after rotation
pub const MASK_DELTA: u32 = 0xa282_ead8;

/// Raw (unmasked) CRC-32C of `bytes`
#[inline]
pub fn crc32c(bytes: &[u8]) -> u32 {
    ::crc32c::crc32c(bytes)
}

/// Apply the rotate-and-add mask to a raw CRC
#[inline]
pub fn mask(crc: u32) -> u32 {
    crc.rotate_right(MASK_ROTATION).wrapping_add(MASK_DELTA)
}

/// Invert [`mask`], recovering the raw CRC
#[inline]
pub fn unmask(masked: u32) -> u32 {
    masked.wrapping_sub(MASK_DELTA).rotate_left(MASK_ROTATION)
}

/// Masked CRC-32C of `bytes`, as stored on disk
#[inline]
pub fn masked_crc(bytes: &[u8]) -> u32 {
    mask(crc32c(bytes))
}

/// Check `bytes` against a stored masked checksum
#[inline]
pub fn verify(bytes: &[u8], expected: u32) -> bool {
    masked_crc(bytes) == expected
}
