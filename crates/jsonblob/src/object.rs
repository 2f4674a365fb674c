//! Object containers.
//!
//! Entries live in the payload region and are reached through a table of
//! entry offsets kept in ascending key order, so lookups are a binary search
//! over the table. An entry is a value cell followed by its key:
//!
//! ```text
//! +------+----------------------------------+---------+
//! | cell | key (u16 len + Latin-1 | i32 len + UTF-16) | padding |
//! +------+----------------------------------+---------+
//! ```

use alloc::string::String;
use core::{cmp::Ordering, fmt};

use crate::{
    base::Header,
    cell::{Cell, ValueRef},
    layout::{BASE_SIZE, SLOT_SIZE, aligned_size, get_u32, read_u32},
    string::{self, StrRef},
    value::Map,
};

/// A read-only view of an object container.
#[derive(Clone, Copy)]
pub struct ObjectRef<'a> {
    bytes: &'a [u8],
    header: Header,
}

impl<'a> ObjectRef<'a> {
    /// `bytes` starts at the container header of a validated object.
    pub(crate) fn new(bytes: &'a [u8]) -> Self {
        let header = Header::read(bytes);
        Self {
            bytes: &bytes[..header.size as usize],
            header,
        }
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.header.len()
    }

    /// Whether the object has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Size of the container in bytes, header and table included.
    #[must_use]
    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    /// The entry at table position `i`.
    ///
    /// # Panics
    ///
    /// Panics if `i >= len()`.
    #[must_use]
    pub fn entry_at(&self, i: usize) -> Entry<'a> {
        assert!(i < self.len(), "index {i} out of range for object of length {}", self.len());
        let at = read_u32(self.bytes, self.header.table() + i * SLOT_SIZE) as usize;
        Entry {
            container: self.bytes,
            at,
        }
    }

    /// Binary search for `key`. Returns the position of the entry holding
    /// `key` and `true`, or the position where it would be inserted and
    /// `false`.
    #[must_use]
    pub fn index_of(&self, key: &str) -> (usize, bool) {
        let mut min = 0;
        let mut n = self.len();
        while n > 0 {
            let half = n >> 1;
            let middle = min + half;
            if self.entry_at(middle).cmp_key(key) == Ordering::Less {
                min = middle + 1;
                n -= half + 1;
            } else {
                n = half;
            }
        }
        let exists = min < self.len() && self.entry_at(min).cmp_key(key) == Ordering::Equal;
        (min, exists)
    }

    /// The value stored under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<ValueRef<'a>> {
        match self.index_of(key) {
            (i, true) => Some(self.entry_at(i).value()),
            (_, false) => None,
        }
    }

    /// Whether `key` is present.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.index_of(key).1
    }

    /// Iterates the entries in key order.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = Entry<'a>> + use<'a> {
        let this = *self;
        (0..this.len()).map(move |i| this.entry_at(i))
    }

    /// Copies the entries out.
    #[must_use]
    pub fn to_map(&self) -> Map {
        self.iter()
            .map(|e| (e.key_string(), e.value().to_value()))
            .collect()
    }
}

impl fmt::Debug for ObjectRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.iter().map(|e| (e.key(), e.value())))
            .finish()
    }
}

/// A read-only view of one object entry.
#[derive(Clone, Copy)]
pub struct Entry<'a> {
    container: &'a [u8],
    at: usize,
}

impl<'a> Entry<'a> {
    pub(crate) fn cell(&self) -> Cell {
        Cell::read(self.container, self.at)
    }

    /// Container-relative offset of the entry.
    pub(crate) fn offset(&self) -> usize {
        self.at
    }

    /// The stored key.
    #[must_use]
    pub fn key(&self) -> StrRef<'a> {
        StrRef::read(&self.container[self.at + 4..], self.cell().latin_key())
    }

    /// The key as an owned `String`.
    #[must_use]
    pub fn key_string(&self) -> String {
        self.key().to_string_lossy()
    }

    /// Ordinal comparison of this entry's key with `key`.
    #[must_use]
    pub fn cmp_key(&self, key: &str) -> Ordering {
        self.key().cmp_str(key)
    }

    /// The entry's value.
    #[must_use]
    pub fn value(&self) -> ValueRef<'a> {
        ValueRef::new(self.container, self.cell())
    }

    /// Size of the entry itself (cell and key), aligned.
    #[must_use]
    pub fn size(&self) -> usize {
        aligned_size(4 + self.key().stored_len())
    }

    /// Size of the entry plus its value's out-of-line payload.
    #[must_use]
    pub fn used_storage(&self) -> usize {
        self.size() + self.value().used_storage()
    }
}

impl fmt::Debug for Entry<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entry")
            .field("key", &self.key())
            .field("value", &self.value())
            .finish()
    }
}

/// Checks an untrusted entry that may use at most `max_size` bytes of
/// `entry`.
fn entry_is_valid(entry: &[u8], max_size: usize) -> bool {
    if max_size < 4 {
        return false;
    }
    let (Some(raw), Some(key)) = (get_u32(entry, 0), entry.get(4..)) else {
        return false;
    };
    if Cell::from_raw(raw).latin_key() {
        string::latin1_is_valid(key, max_size - 4)
    } else {
        string::utf16_is_valid(key, max_size - 4)
    }
}

/// Checks an untrusted object container that may use at most `max_size`
/// bytes of `container`. Keys must appear in non-decreasing order, otherwise
/// [`ObjectRef::index_of`] would silently miss entries.
pub(crate) fn is_valid(container: &[u8], max_size: usize, depth: usize) -> bool {
    let Some(header) = Header::get(container) else {
        return false;
    };
    if !header.is_object || !header.is_valid(max_size.min(container.len())) {
        tracing::trace!(?header, max_size, "object framing out of bounds");
        return false;
    }
    let container = &container[..header.size as usize];
    let table = header.table();
    let mut last: Option<StrRef<'_>> = None;
    for i in 0..header.len() {
        let Some(at) = get_u32(container, table + i * SLOT_SIZE).map(|o| o as usize) else {
            return false;
        };
        if at < BASE_SIZE || at + 4 >= table {
            tracing::trace!(entry = i, offset = at, table, "entry offset outside data region");
            return false;
        }
        if !entry_is_valid(&container[at..table], table - at) {
            tracing::trace!(entry = i, "entry key overruns data region");
            return false;
        }
        let entry = Entry { container, at };
        let key = entry.key();
        if last.is_some_and(|prev| key < prev) {
            tracing::trace!(entry = i, "object keys out of order");
            return false;
        }
        if !entry.cell().is_valid(container, table, depth) {
            return false;
        }
        last = Some(key);
    }
    true
}
