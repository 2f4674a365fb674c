//! Wire constants and little-endian accessors for the binary document format.
//!
//! Every multi-byte field in a document is little-endian and every offset is
//! relative, so a buffer can be moved, grown or copied as one block. Views in
//! this crate never alias bytes as structs; they read and write fields through
//! the helpers below.
//!
//! The `read_*`/`write_*` helpers index slices directly and are used on
//! buffers that are already known to be well formed (slice indexing is still
//! bounds-checked, so a logic error panics instead of reading out of bounds).
//! The `get_*` helpers return `None` instead and are what the validator uses
//! on untrusted input.

/// Magic number at the start of every document: the bytes `qbjs`.
pub const TAG: u32 = u32::from_le_bytes(*b"qbjs");

/// The only format version this crate reads and writes.
pub const VERSION: u32 = 1;

/// Size of the document header (`tag`, `version`).
pub const HEADER_SIZE: usize = 8;

/// Size of a container header (`size`, `is_object`/`length`, `table_offset`).
pub const BASE_SIZE: usize = 12;

/// Width of a table slot. Value cells have the same width, which is what lets
/// an array use its cells as its table.
pub const SLOT_SIZE: usize = 4;

/// Largest container size (and payload offset) a value cell can address.
pub const MAX_SIZE: usize = (1 << 27) - 1;

/// Deepest container nesting accepted when building or validating a document.
pub const MAX_DEPTH: usize = 512;

/// Rounds `size` up to the 4-byte alignment unit of payloads.
#[inline]
#[must_use]
pub(crate) const fn aligned_size(size: usize) -> usize {
    (size + 3) & !3
}

/// Narrows a buffer offset to a wire field. Callers only pass values bounded
/// by [`MAX_SIZE`].
#[inline]
#[allow(clippy::cast_possible_truncation)]
pub(crate) fn to_u32(n: usize) -> u32 {
    debug_assert!(n <= u32::MAX as usize);
    n as u32
}

#[inline]
pub(crate) fn read_u16(buf: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([buf[at], buf[at + 1]])
}

#[inline]
pub(crate) fn read_u32(buf: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]])
}

#[inline]
pub(crate) fn read_i32(buf: &[u8], at: usize) -> i32 {
    i32::from_le_bytes([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]])
}

#[inline]
pub(crate) fn read_u64(buf: &[u8], at: usize) -> u64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&buf[at..at + 8]);
    u64::from_le_bytes(bytes)
}

#[inline]
pub(crate) fn get_u16(buf: &[u8], at: usize) -> Option<u16> {
    let bytes = buf.get(at..at.checked_add(2)?)?;
    Some(u16::from_le_bytes([bytes[0], bytes[1]]))
}

#[inline]
pub(crate) fn get_u32(buf: &[u8], at: usize) -> Option<u32> {
    let bytes = buf.get(at..at.checked_add(4)?)?;
    Some(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

#[inline]
pub(crate) fn get_i32(buf: &[u8], at: usize) -> Option<i32> {
    let bytes = buf.get(at..at.checked_add(4)?)?;
    Some(i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

#[inline]
pub(crate) fn write_u16(buf: &mut [u8], at: usize, value: u16) {
    buf[at..at + 2].copy_from_slice(&value.to_le_bytes());
}

#[inline]
pub(crate) fn write_u32(buf: &mut [u8], at: usize, value: u32) {
    buf[at..at + 4].copy_from_slice(&value.to_le_bytes());
}

#[inline]
pub(crate) fn write_i32(buf: &mut [u8], at: usize, value: i32) {
    buf[at..at + 4].copy_from_slice(&value.to_le_bytes());
}

#[inline]
pub(crate) fn write_u64(buf: &mut [u8], at: usize, value: u64) {
    buf[at..at + 8].copy_from_slice(&value.to_le_bytes());
}
