//! Container headers and the two in-place edit primitives shared by arrays
//! and objects.
//!
//! A container is laid out as
//!
//! ```text
//! +--------+---------------------------+-------------------+
//! | header | payload (entries, values) | table             |
//! +--------+---------------------------+-------------------+
//! 0        12                          table_offset        size
//! ```
//!
//! The edit primitives only ever run on the root container of a
//! [`Document`](crate::Document), which always ends where the buffer ends, so
//! growing it is a resize of the buffer's tail.

use alloc::vec::Vec;

use crate::{
    error::MutationError,
    layout::{BASE_SIZE, MAX_SIZE, SLOT_SIZE, get_u32, read_u32, to_u32, write_u32},
};

/// Decoded container header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Header {
    pub(crate) size: u32,
    pub(crate) is_object: bool,
    pub(crate) length: u32,
    pub(crate) table_offset: u32,
}

impl Header {
    pub(crate) fn empty(is_object: bool) -> Self {
        Header {
            size: to_u32(BASE_SIZE),
            is_object,
            length: 0,
            table_offset: to_u32(BASE_SIZE),
        }
    }

    /// Reads the header at the start of a trusted container.
    pub(crate) fn read(container: &[u8]) -> Self {
        Self::from_words(read_u32(container, 0), read_u32(container, 4), read_u32(container, 8))
    }

    /// Reads the header at the start of an untrusted container.
    pub(crate) fn get(container: &[u8]) -> Option<Self> {
        Some(Self::from_words(
            get_u32(container, 0)?,
            get_u32(container, 4)?,
            get_u32(container, 8)?,
        ))
    }

    fn from_words(size: u32, bits: u32, table_offset: u32) -> Self {
        Header {
            size,
            is_object: bits & 1 != 0,
            length: bits >> 1,
            table_offset,
        }
    }

    pub(crate) fn write(self, container: &mut [u8]) {
        write_u32(container, 0, self.size);
        write_u32(container, 4, (self.length << 1) | u32::from(self.is_object));
        write_u32(container, 8, self.table_offset);
    }

    pub(crate) fn len(self) -> usize {
        self.length as usize
    }

    pub(crate) fn table(self) -> usize {
        self.table_offset as usize
    }

    /// Checks the framing of an untrusted container that may use at most
    /// `max_size` bytes.
    pub(crate) fn is_valid(self, max_size: usize) -> bool {
        let size = self.size as usize;
        let table_end = (self.len() as u64) * SLOT_SIZE as u64 + u64::from(self.table_offset);
        size <= max_size
            && size >= BASE_SIZE
            && self.table() >= BASE_SIZE
            && table_end <= u64::from(self.size)
    }
}

/// Carves out `data_size` bytes of payload and, unless `replace` is set,
/// `num_items` new table slots at `pos` in the container starting at `at`.
///
/// The table is moved forward past the new payload region, which is
/// zero-filled. New slots are set to the payload offset. With `replace` the
/// slot at `pos` is overwritten instead and `length` is unchanged; the bytes
/// the old slot pointed at become dead.
///
/// Returns the container-relative offset of the payload region. Fails
/// without touching the buffer if the container would outgrow [`MAX_SIZE`].
pub(crate) fn reserve_space(
    buf: &mut Vec<u8>,
    at: usize,
    data_size: usize,
    pos: usize,
    num_items: usize,
    replace: bool,
) -> Result<usize, MutationError> {
    let mut header = Header::read(&buf[at..]);
    let len = header.len();
    debug_assert!(pos <= len);

    let gap = if replace { 0 } else { num_items * SLOT_SIZE };
    let requested = data_size + gap;
    let new_size = header.size as usize + requested;
    if new_size > MAX_SIZE {
        tracing::warn!(
            size = header.size,
            requested,
            max = MAX_SIZE,
            "document too large to store in data structure"
        );
        return Err(MutationError::CapacityExceeded {
            size: header.size as usize,
            requested,
        });
    }

    debug_assert_eq!(buf.len(), at + header.size as usize);

    let off = header.table();
    let table = at + off;
    let new_table = table + data_size;
    buf.resize(at + new_size, 0);
    if replace {
        buf.copy_within(table..table + len * SLOT_SIZE, new_table);
    } else {
        buf.copy_within(
            table + pos * SLOT_SIZE..table + len * SLOT_SIZE,
            new_table + pos * SLOT_SIZE + gap,
        );
        buf.copy_within(table..table + pos * SLOT_SIZE, new_table);
    }
    buf[table..new_table].fill(0);
    for i in 0..num_items {
        write_u32(buf, new_table + (pos + i) * SLOT_SIZE, to_u32(off));
    }

    header.table_offset = to_u32(off + data_size);
    header.size = to_u32(new_size);
    if !replace {
        header.length += to_u32(num_items);
    }
    header.write(&mut buf[at..]);
    Ok(off)
}

/// Removes `num_items` table slots starting at `pos`. The payload they
/// referenced stays in place as dead bytes until the next compaction.
pub(crate) fn remove_items(buf: &mut [u8], at: usize, pos: usize, num_items: usize) {
    let mut header = Header::read(&buf[at..]);
    let len = header.len();
    debug_assert!(pos + num_items <= len);
    let table = at + header.table();
    buf.copy_within(
        table + (pos + num_items) * SLOT_SIZE..table + len * SLOT_SIZE,
        table + pos * SLOT_SIZE,
    );
    header.length -= to_u32(num_items);
    header.write(&mut buf[at..]);
}
