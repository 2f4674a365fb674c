//! String payloads and object keys.
//!
//! A string is stored in one of two encodings:
//!
//! - compact: `u16` character count followed by one Latin-1 byte per char.
//!   Used when every char is below U+0100 and there are fewer than `0x8000`
//!   of them.
//! - full: `i32` UTF-16 code unit count followed by the code units.
//!
//! Keys are ordered by their UTF-16 code units, whichever encoding they use,
//! so compact and full keys compare consistently with each other and with a
//! `&str` lookup key.

use alloc::string::String;
use core::{cmp::Ordering, fmt};

use crate::layout::{
    aligned_size, get_i32, get_u16, read_i32, read_u16, write_i32, write_u16,
};

/// Char count limit (exclusive) of the compact encoding.
pub(crate) const MAX_COMPACT_LEN: usize = 0x8000;

/// Whether `s` can use the compact Latin-1 encoding.
pub(crate) fn use_compressed(s: &str) -> bool {
    let mut count = 0usize;
    for c in s.chars() {
        if u32::from(c) >= 0x100 {
            return false;
        }
        count += 1;
        if count >= MAX_COMPACT_LEN {
            return false;
        }
    }
    true
}

/// Aligned payload size of `s` in the chosen encoding.
pub(crate) fn encoded_size(s: &str, compressed: bool) -> usize {
    if compressed {
        aligned_size(2 + s.chars().count())
    } else {
        aligned_size(4 + 2 * s.encode_utf16().count())
    }
}

/// Writes `s` at the start of `dest`, which must hold at least
/// [`encoded_size`] bytes. Padding bytes are left untouched.
pub(crate) fn write_string(dest: &mut [u8], s: &str, compressed: bool) {
    if compressed {
        let mut len = 0u16;
        for (i, c) in s.chars().enumerate() {
            // use_compressed() guarantees every char fits a byte
            dest[2 + i] = u8::try_from(u32::from(c)).unwrap_or(b'?');
            len += 1;
        }
        write_u16(dest, 0, len);
    } else {
        let mut len = 0usize;
        for unit in s.encode_utf16() {
            write_u16(dest, 4 + 2 * len, unit);
            len += 1;
        }
        write_i32(dest, 0, i32::try_from(len).unwrap_or(i32::MAX));
    }
}

/// A decoded view of a stored string (value payload or key), excluding its
/// length prefix.
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum StrRef<'a> {
    /// One byte per char.
    Latin1(&'a [u8]),
    /// Little-endian UTF-16 code units.
    Utf16(&'a [u8]),
}

impl<'a> StrRef<'a> {
    /// Reads a compact string whose length prefix starts at `data[0]`.
    pub(crate) fn latin1(data: &'a [u8]) -> Self {
        let len = usize::from(read_u16(data, 0));
        StrRef::Latin1(&data[2..2 + len])
    }

    /// Reads a full string whose length prefix starts at `data[0]`.
    pub(crate) fn utf16(data: &'a [u8]) -> Self {
        let len = usize::try_from(read_i32(data, 0)).unwrap_or(0);
        StrRef::Utf16(&data[4..4 + 2 * len])
    }

    /// Reads a string in either encoding.
    pub(crate) fn read(data: &'a [u8], compressed: bool) -> Self {
        if compressed {
            Self::latin1(data)
        } else {
            Self::utf16(data)
        }
    }

    /// Size in bytes including the length prefix, before alignment.
    pub(crate) fn stored_len(&self) -> usize {
        match self {
            StrRef::Latin1(bytes) => 2 + bytes.len(),
            StrRef::Utf16(bytes) => 4 + bytes.len(),
        }
    }

    /// Whether the compact encoding is in use.
    #[must_use]
    pub fn is_latin1(&self) -> bool {
        matches!(self, StrRef::Latin1(_))
    }

    /// The string as UTF-16 code units.
    pub fn units(self) -> impl Iterator<Item = u16> + 'a {
        let (latin, wide): (&'a [u8], &'a [u8]) = match self {
            StrRef::Latin1(bytes) => (bytes, &[]),
            StrRef::Utf16(bytes) => (&[], bytes),
        };
        latin
            .iter()
            .map(|&b| u16::from(b))
            .chain(wide.chunks_exact(2).map(|c| u16::from_le_bytes([c[0], c[1]])))
    }

    /// Length in UTF-16 code units.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            StrRef::Latin1(bytes) => bytes.len(),
            StrRef::Utf16(bytes) => bytes.len() / 2,
        }
    }

    /// Whether the string is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Ordinal comparison against a `&str`.
    #[must_use]
    pub fn cmp_str(&self, other: &str) -> Ordering {
        self.units().cmp(other.encode_utf16())
    }

    /// Decodes into an owned `String`. Unpaired surrogates, which the
    /// validator rejects, decode to U+FFFD.
    #[must_use]
    pub fn to_string_lossy(&self) -> String {
        match self {
            StrRef::Latin1(bytes) => bytes.iter().map(|&b| char::from(b)).collect(),
            StrRef::Utf16(_) => char::decode_utf16(self.units())
                .map(|r| r.unwrap_or(char::REPLACEMENT_CHARACTER))
                .collect(),
        }
    }
}

impl Ord for StrRef<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.units().cmp(other.units())
    }
}

impl PartialOrd for StrRef<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq<str> for StrRef<'_> {
    fn eq(&self, other: &str) -> bool {
        self.cmp_str(other) == Ordering::Equal
    }
}

impl fmt::Debug for StrRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StrRef::Latin1(bytes) => write!(f, "Latin1({:?})", bstr::BStr::new(bytes)),
            StrRef::Utf16(_) => write!(f, "Utf16({:?})", self.to_string_lossy()),
        }
    }
}

/// Checks a compact string whose prefix starts at `data[0]` against the
/// `max_size` bytes available to it.
pub(crate) fn latin1_is_valid(data: &[u8], max_size: usize) -> bool {
    let Some(len) = get_u16(data, 0) else {
        return false;
    };
    let needed = aligned_size(2 + usize::from(len));
    needed <= max_size && needed <= data.len()
}

/// Checks a full string whose prefix starts at `data[0]` against the
/// `max_size` bytes available to it, including UTF-16 well-formedness.
pub(crate) fn utf16_is_valid(data: &[u8], max_size: usize) -> bool {
    let Some(len) = get_i32(data, 0).and_then(|l| usize::try_from(l).ok()) else {
        return false;
    };
    let Some(needed) = len.checked_mul(2).and_then(|n| n.checked_add(4)) else {
        return false;
    };
    if aligned_size(needed) > max_size || aligned_size(needed) > data.len() {
        return false;
    }
    char::decode_utf16(StrRef::Utf16(&data[4..needed]).units()).all(|r| r.is_ok())
}
