//! Array containers. The table of an array is its list of value cells.

use alloc::vec::Vec;
use core::fmt;

use crate::{
    base::Header,
    cell::{Cell, ValueRef},
    layout::SLOT_SIZE,
    value::Value,
};

/// A read-only view of an array container.
#[derive(Clone, Copy)]
pub struct ArrayRef<'a> {
    bytes: &'a [u8],
    header: Header,
}

impl<'a> ArrayRef<'a> {
    /// `bytes` starts at the container header of a validated array.
    pub(crate) fn new(bytes: &'a [u8]) -> Self {
        let header = Header::read(bytes);
        Self {
            bytes: &bytes[..header.size as usize],
            header,
        }
    }

    /// Number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.header.len()
    }

    /// Whether the array has no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Size of the container in bytes, header and table included.
    #[must_use]
    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    pub(crate) fn cell_at(&self, i: usize) -> Cell {
        Cell::read(self.bytes, self.header.table() + i * SLOT_SIZE)
    }

    pub(crate) fn bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// The element at `i`.
    ///
    /// # Panics
    ///
    /// Panics if `i >= len()`.
    #[must_use]
    pub fn at(&self, i: usize) -> ValueRef<'a> {
        assert!(i < self.len(), "index {i} out of range for array of length {}", self.len());
        ValueRef::new(self.bytes, self.cell_at(i))
    }

    /// The element at `i`, or `None` if out of range.
    #[must_use]
    pub fn get(&self, i: usize) -> Option<ValueRef<'a>> {
        (i < self.len()).then(|| self.at(i))
    }

    /// Iterates the elements in order.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = ValueRef<'a>> + use<'a> {
        let this = *self;
        (0..this.len()).map(move |i| this.at(i))
    }

    /// Copies the elements out.
    #[must_use]
    pub fn to_vec(&self) -> Vec<Value> {
        self.iter().map(|v| v.to_value()).collect()
    }
}

impl fmt::Debug for ArrayRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

/// Checks an untrusted array container that may use at most `max_size`
/// bytes of `container`.
pub(crate) fn is_valid(container: &[u8], max_size: usize, depth: usize) -> bool {
    let Some(header) = Header::get(container) else {
        return false;
    };
    if header.is_object || !header.is_valid(max_size.min(container.len())) {
        tracing::trace!(?header, max_size, "array framing out of bounds");
        return false;
    }
    let container = &container[..header.size as usize];
    let table = header.table();
    (0..header.len()).all(|i| {
        crate::layout::get_u32(container, table + i * SLOT_SIZE)
            .is_some_and(|raw| Cell::from_raw(raw).is_valid(container, table, depth))
    })
}
