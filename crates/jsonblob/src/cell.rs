//! Value cells.
//!
//! A cell is one little-endian `u32`:
//!
//! ```text
//!  31                               5   4   3   2   0
//! +----------------------------------+---+---+-------+
//! |              value               | K | C | type  |
//! +----------------------------------+---+---+-------+
//! ```
//!
//! - `type`: one of [`ValueType`].
//! - `C` (`latin_or_int`): the value uses its compressed encoding, an inline
//!   integer for numbers or Latin-1 for strings.
//! - `K` (`latin_key`): only used by object entries, the key is Latin-1.
//! - `value`: `0`/`1` for booleans, a signed 27-bit integer for compressed
//!   numbers, otherwise the container-relative offset of the payload.

use alloc::{borrow::ToOwned, string::String, vec, vec::Vec};
use core::fmt;

use crate::{
    array::{self, ArrayRef},
    document::Document,
    error::MutationError,
    layout::{BASE_SIZE, MAX_DEPTH, aligned_size, read_u32, read_u64, write_u64},
    object::{self, ObjectRef},
    string::{self, StrRef},
    value::Value,
};

/// The type tag stored in the low three bits of a cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ValueType {
    /// `null`
    Null = 0,
    /// `true` / `false`
    Bool = 1,
    /// A number.
    Double = 2,
    /// A string.
    String = 3,
    /// A nested array.
    Array = 4,
    /// A nested object.
    Object = 5,
}

impl ValueType {
    pub(crate) fn from_bits(bits: u32) -> Option<Self> {
        Some(match bits {
            0 => ValueType::Null,
            1 => ValueType::Bool,
            2 => ValueType::Double,
            3 => ValueType::String,
            4 => ValueType::Array,
            5 => ValueType::Object,
            _ => return None,
        })
    }

    /// Whether values of this type are containers.
    #[must_use]
    pub fn is_container(self) -> bool {
        matches!(self, ValueType::Array | ValueType::Object)
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ValueType::Null => "null",
            ValueType::Bool => "bool",
            ValueType::Double => "number",
            ValueType::String => "string",
            ValueType::Array => "array",
            ValueType::Object => "object",
        })
    }
}

/// A packed value cell.
#[derive(Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Cell(u32);

impl Cell {
    const TYPE_MASK: u32 = 0b111;
    const LATIN_OR_INT: u32 = 1 << 3;
    const LATIN_KEY: u32 = 1 << 4;
    const VALUE_SHIFT: u32 = 5;
    const VALUE_MASK: u32 = (1 << 27) - 1;

    pub(crate) fn new(ty: ValueType, latin_or_int: bool, latin_key: bool, value: u32) -> Self {
        let mut raw = u32::from(ty as u8) | ((value & Self::VALUE_MASK) << Self::VALUE_SHIFT);
        if latin_or_int {
            raw |= Self::LATIN_OR_INT;
        }
        if latin_key {
            raw |= Self::LATIN_KEY;
        }
        Cell(raw)
    }

    pub(crate) fn read(buf: &[u8], at: usize) -> Self {
        Cell(read_u32(buf, at))
    }

    pub(crate) fn from_raw(raw: u32) -> Self {
        Cell(raw)
    }

    pub(crate) fn raw(self) -> u32 {
        self.0
    }

    /// The type tag, or `None` for the two unused tag values.
    pub(crate) fn value_type(self) -> Option<ValueType> {
        ValueType::from_bits(self.0 & Self::TYPE_MASK)
    }

    /// The type tag of a cell from a validated buffer.
    pub(crate) fn ty(self) -> ValueType {
        self.value_type().unwrap_or(ValueType::Null)
    }

    pub(crate) fn latin_or_int(self) -> bool {
        self.0 & Self::LATIN_OR_INT != 0
    }

    pub(crate) fn latin_key(self) -> bool {
        self.0 & Self::LATIN_KEY != 0
    }

    pub(crate) fn value(self) -> u32 {
        self.0 >> Self::VALUE_SHIFT
    }

    /// The value field as a sign-extended 27-bit integer.
    pub(crate) fn int_value(self) -> i32 {
        i32::from_ne_bytes(self.0.to_ne_bytes()) >> Self::VALUE_SHIFT
    }

    pub(crate) fn with_value(self, value: u32) -> Self {
        Cell((self.0 & ((1 << Self::VALUE_SHIFT) - 1)) | ((value & Self::VALUE_MASK) << Self::VALUE_SHIFT))
    }

    fn offset(self) -> usize {
        self.value() as usize
    }

    fn has_payload(self) -> bool {
        match self.ty() {
            ValueType::Null | ValueType::Bool => false,
            ValueType::Double => !self.latin_or_int(),
            ValueType::String | ValueType::Array | ValueType::Object => true,
        }
    }

    /// Aligned size of the out-of-line payload this cell owns in `container`.
    pub(crate) fn used_storage(self, container: &[u8]) -> usize {
        if !self.has_payload() {
            return 0;
        }
        let at = self.offset();
        let size = match self.ty() {
            ValueType::Double => 8,
            ValueType::String => StrRef::read(&container[at..], self.latin_or_int()).stored_len(),
            ValueType::Array | ValueType::Object => read_u32(container, at) as usize,
            ValueType::Null | ValueType::Bool => 0,
        };
        aligned_size(size)
    }

    /// Checks the cell against a container of untrusted content whose table
    /// starts at `table_offset`. `container` must span at least
    /// `table_offset` bytes. `depth` is the nesting depth of that container.
    pub(crate) fn is_valid(self, container: &[u8], table_offset: usize, depth: usize) -> bool {
        let Some(ty) = self.value_type() else {
            tracing::trace!(raw = self.0, "unknown value type");
            return false;
        };
        if !self.has_payload() {
            return true;
        }
        let at = self.offset();
        if !is_valid_value_offset(at, table_offset) {
            tracing::trace!(offset = at, table_offset, "payload offset outside data region");
            return false;
        }
        let Some(data) = container.get(at..table_offset) else {
            return false;
        };
        let max_size = table_offset - at;
        match ty {
            ValueType::Double => max_size >= 8,
            ValueType::String if self.latin_or_int() => string::latin1_is_valid(data, max_size),
            ValueType::String => string::utf16_is_valid(data, max_size),
            ValueType::Array | ValueType::Object if depth >= MAX_DEPTH => {
                tracing::trace!(depth, "containers nested too deeply");
                false
            }
            ValueType::Array => array::is_valid(data, max_size, depth + 1),
            ValueType::Object => object::is_valid(data, max_size, depth + 1),
            ValueType::Null | ValueType::Bool => true,
        }
    }
}

impl fmt::Debug for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cell")
            .field("type", &self.value_type())
            .field("latin_or_int", &self.latin_or_int())
            .field("latin_key", &self.latin_key())
            .field("value", &self.value())
            .finish()
    }
}

#[inline]
fn is_valid_value_offset(offset: usize, table_offset: usize) -> bool {
    offset >= BASE_SIZE && offset.saturating_add(4) <= table_offset
}

/// Returns the inline integer for `d` when it can be stored in a cell:
/// finite, integral and `1 <= |d| < 2^26`.
pub(crate) fn compressed_number(d: f64) -> Option<i32> {
    const EXPONENT_OFF: u32 = 52;
    const FRACTION_MASK: u64 = 0x000f_ffff_ffff_ffff;
    const EXPONENT_MASK: u64 = 0x7ff0_0000_0000_0000;

    let bits = d.to_bits();
    let exp = i32::try_from((bits & EXPONENT_MASK) >> EXPONENT_OFF).unwrap_or(i32::MAX) - 1023;
    if !(0..=25).contains(&exp) {
        return None;
    }
    let exp = exp.unsigned_abs();
    if bits & (FRACTION_MASK >> exp) != 0 {
        return None;
    }
    let negative = bits >> 63 != 0;
    let mantissa = (bits & FRACTION_MASK) | (1 << EXPONENT_OFF);
    let magnitude = i32::try_from(mantissa >> (EXPONENT_OFF - exp)).ok()?;
    Some(if negative { -magnitude } else { magnitude })
}

/// A value that has been sized and encoded for insertion into a container.
///
/// Building one is the `requiredStorage` step of an insert: it decides
/// between the compressed and the full encoding and renders the out-of-line
/// payload, so the insert itself only has to reserve space and copy.
#[derive(Debug, Clone)]
pub(crate) struct Prepared {
    ty: ValueType,
    compressed: bool,
    inline: u32,
    payload: Vec<u8>,
}

impl Prepared {
    /// Prepares `value` to be placed at nesting depth `depth`.
    pub(crate) fn new(value: &Value, depth: usize) -> Result<Self, MutationError> {
        let scalar = |ty, compressed, inline, payload| Prepared {
            ty,
            compressed,
            inline,
            payload,
        };
        Ok(match value {
            Value::Null => scalar(ValueType::Null, false, 0, Vec::new()),
            Value::Boolean(b) => scalar(ValueType::Bool, false, u32::from(*b), Vec::new()),
            Value::Number(d) => match compressed_number(*d) {
                Some(i) => scalar(
                    ValueType::Double,
                    true,
                    u32::from_ne_bytes(i.to_ne_bytes()),
                    Vec::new(),
                ),
                None => {
                    let mut payload = vec![0u8; 8];
                    write_u64(&mut payload, 0, d.to_bits());
                    scalar(ValueType::Double, false, 0, payload)
                }
            },
            Value::String(s) => {
                let compressed = string::use_compressed(s);
                let mut payload = vec![0u8; string::encoded_size(s, compressed)];
                string::write_string(&mut payload, s, compressed);
                scalar(ValueType::String, compressed, 0, payload)
            }
            Value::Array(_) | Value::Object(_) => {
                if depth > MAX_DEPTH {
                    return Err(MutationError::TooDeep);
                }
                let doc = Document::build(value, depth)?;
                Self::container(doc.root_bytes(), doc.is_object())
            }
        })
    }

    /// Prepares an already-encoded container.
    pub(crate) fn container(bytes: &[u8], is_object: bool) -> Self {
        Prepared {
            ty: if is_object {
                ValueType::Object
            } else {
                ValueType::Array
            },
            compressed: false,
            inline: 0,
            payload: bytes.to_owned(),
        }
    }

    /// Out-of-line bytes the value needs, already aligned.
    pub(crate) fn required_storage(&self) -> usize {
        self.payload.len()
    }

    /// The `value` field to store for a payload written at `offset`.
    pub(crate) fn value_to_store(&self, offset: usize) -> u32 {
        if self.payload.is_empty() {
            self.inline
        } else {
            crate::layout::to_u32(offset)
        }
    }

    /// The cell describing this value with its payload at `offset`.
    pub(crate) fn cell(&self, offset: usize, latin_key: bool) -> Cell {
        Cell::new(self.ty, self.compressed, latin_key, self.value_to_store(offset))
    }

    /// Writes the payload at the start of `dest`.
    pub(crate) fn copy_data(&self, dest: &mut [u8]) {
        dest[..self.payload.len()].copy_from_slice(&self.payload);
    }
}

/// A read-only view of one value inside a document.
///
/// Views borrow the document, so they cannot outlive a mutation.
#[derive(Clone, Copy)]
pub struct ValueRef<'a> {
    container: &'a [u8],
    cell: Cell,
}

impl<'a> ValueRef<'a> {
    pub(crate) fn new(container: &'a [u8], cell: Cell) -> Self {
        Self { container, cell }
    }

    /// The type of the value.
    #[must_use]
    pub fn value_type(&self) -> ValueType {
        self.cell.ty()
    }

    /// Whether the value is `null`.
    #[must_use]
    pub fn is_null(&self) -> bool {
        self.value_type() == ValueType::Null
    }

    /// Whether the value is stored in its compressed form: an inline integer
    /// for numbers, Latin-1 for strings.
    #[must_use]
    pub fn is_compressed(&self) -> bool {
        self.cell.latin_or_int()
    }

    /// Aligned out-of-line bytes used by this value.
    #[must_use]
    pub fn used_storage(&self) -> usize {
        self.cell.used_storage(self.container)
    }

    /// The boolean, if this is a boolean.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        (self.value_type() == ValueType::Bool).then(|| self.cell.value() != 0)
    }

    /// The number, if this is a number.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        if self.value_type() != ValueType::Double {
            return None;
        }
        Some(if self.cell.latin_or_int() {
            f64::from(self.cell.int_value())
        } else {
            f64::from_bits(read_u64(self.container, self.cell.offset()))
        })
    }

    /// The stored string, if this is a string.
    #[must_use]
    pub fn as_str_ref(&self) -> Option<StrRef<'a>> {
        (self.value_type() == ValueType::String).then(|| {
            StrRef::read(&self.container[self.cell.offset()..], self.cell.latin_or_int())
        })
    }

    /// The decoded string, if this is a string.
    #[must_use]
    pub fn as_string(&self) -> Option<String> {
        self.as_str_ref().map(|s| s.to_string_lossy())
    }

    /// The nested array, if this is an array.
    #[must_use]
    pub fn as_array(&self) -> Option<ArrayRef<'a>> {
        (self.value_type() == ValueType::Array)
            .then(|| ArrayRef::new(&self.container[self.cell.offset()..]))
    }

    /// The nested object, if this is an object.
    #[must_use]
    pub fn as_object(&self) -> Option<ObjectRef<'a>> {
        (self.value_type() == ValueType::Object)
            .then(|| ObjectRef::new(&self.container[self.cell.offset()..]))
    }

    /// Raw bytes of a nested container.
    pub(crate) fn container_bytes(&self) -> Option<&'a [u8]> {
        if !self.value_type().is_container() {
            return None;
        }
        let at = self.cell.offset();
        let size = read_u32(self.container, at) as usize;
        Some(&self.container[at..at + size])
    }

    /// Copies the value out into an owned [`Value`].
    #[must_use]
    pub fn to_value(&self) -> Value {
        match self.value_type() {
            ValueType::Null => Value::Null,
            ValueType::Bool => Value::Boolean(self.cell.value() != 0),
            ValueType::Double => Value::Number(self.as_f64().unwrap_or_default()),
            ValueType::String => Value::String(self.as_string().unwrap_or_default()),
            ValueType::Array => self
                .as_array()
                .map_or(Value::Null, |a| Value::Array(a.to_vec())),
            ValueType::Object => self
                .as_object()
                .map_or(Value::Null, |o| Value::Object(o.to_map())),
        }
    }
}

impl fmt::Debug for ValueRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ValueRef").field(&self.to_value()).finish()
    }
}

#[cfg(test)]
mod tests {
    use alloc::string::ToString;

    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(1.0, Some(1))]
    #[case(-1.0, Some(-1))]
    #[case(42.0, Some(42))]
    #[case(67_108_863.0, Some(67_108_863))]
    #[case(-67_108_863.0, Some(-67_108_863))]
    #[case(67_108_864.0, None)]
    #[case(0.0, None)]
    #[case(-0.0, None)]
    #[case(0.5, None)]
    #[case(1.5, None)]
    #[case(2_147_483_647.0, None)]
    #[case(1e300, None)]
    #[case(f64::INFINITY, None)]
    #[case(f64::NAN, None)]
    fn number_compression(#[case] d: f64, #[case] expected: Option<i32>) {
        assert_eq!(compressed_number(d), expected);
    }

    #[test]
    fn cell_fields_roundtrip() {
        let cell = Cell::new(ValueType::String, true, true, 0x1234);
        assert_eq!(cell.ty(), ValueType::String);
        assert!(cell.latin_or_int());
        assert!(cell.latin_key());
        assert_eq!(cell.value(), 0x1234);
        assert_eq!(cell.with_value(8).value(), 8);
        assert!(cell.with_value(8).latin_key());
    }

    #[test]
    fn inline_integers_are_sign_extended() {
        let p = Prepared::new(&Value::Number(-5.0), 1).unwrap();
        let cell = p.cell(0, false);
        assert!(cell.latin_or_int());
        assert_eq!(cell.int_value(), -5);
        assert_eq!(p.required_storage(), 0);
    }

    #[test]
    fn unknown_type_tags_are_invalid() {
        let cell = Cell::from_raw(6);
        assert_eq!(cell.value_type(), None);
        assert!(!cell.is_valid(&[0u8; 16], 16, 0));
    }

    #[test]
    fn payload_offsets_must_precede_the_table() {
        let container = [0u8; 32];
        let inside = Cell::new(ValueType::Double, false, false, 12);
        assert!(inside.is_valid(&container, 20, 0));
        assert!(!inside.is_valid(&container, 16, 0));
        let in_header = Cell::new(ValueType::Double, false, false, 4);
        assert!(!in_header.is_valid(&container, 32, 0));
    }

    #[test]
    fn prepared_strings_pick_their_encoding() {
        let latin = Prepared::new(&Value::String("abc".to_string()), 1).unwrap();
        assert!(latin.cell(12, false).latin_or_int());
        assert_eq!(latin.required_storage(), 8);

        let wide = Prepared::new(&Value::String("\u{20ac}".to_string()), 1).unwrap();
        assert!(!wide.cell(12, false).latin_or_int());
        assert_eq!(wide.required_storage(), 8);
    }

    #[test]
    fn value_type_names() {
        assert_eq!(ValueType::Double.to_string(), "number");
        assert!(ValueType::Object.is_container());
        assert!(!ValueType::String.is_container());
    }
}
