//! The owning document buffer.
//!
//! A [`Document`] owns a single byte buffer holding the document header and
//! exactly one root container. Everything inside is addressed by relative
//! offsets, so the buffer can be reallocated, compacted or written out as-is.
//!
//! Edits happen in place on the root container. Edits below the root detach
//! the addressed child container into its own document, edit that, and write
//! it back over the old child. Replacing or removing values leaves dead bytes
//! behind; [`Document::compact`] rewrites the buffer without them.

use alloc::{vec, vec::Vec};
use core::fmt;

use crate::{
    array::ArrayRef,
    base::{self, Header},
    cell::{Prepared, ValueRef, ValueType},
    error::{LoadError, MutationError},
    layout::{BASE_SIZE, HEADER_SIZE, MAX_SIZE, SLOT_SIZE, TAG, VERSION, to_u32, write_u32},
    object::ObjectRef,
    options::DocumentOptions,
    path::{DisplayPath, PathComponent},
    string,
    validate,
    value::Value,
};

/// A binary JSON document.
///
/// # Examples
///
/// ```
/// use jsonblob::{Document, Value, path};
///
/// let mut doc = Document::new_object();
/// doc.insert_key("b", &Value::from(1)).unwrap();
/// doc.insert_at(&path!["list"], &Value::Array(vec![])).unwrap();
/// doc.insert_at(&path!["list", 0], &Value::from("x")).unwrap();
///
/// let bytes = doc.to_bytes();
/// let loaded = Document::from_bytes(&bytes).unwrap();
/// assert_eq!(loaded.to_value().to_string(), r#"{"b":1,"list":["x"]}"#);
/// ```
#[derive(Clone)]
pub struct Document {
    bytes: Vec<u8>,
    compaction_counter: u32,
    options: DocumentOptions,
}

/// The root container of a document, or any nested container.
#[derive(Debug, Clone, Copy)]
pub enum Container<'a> {
    Array(ArrayRef<'a>),
    Object(ObjectRef<'a>),
}

impl<'a> Container<'a> {
    /// The container a value refers to, if it is one.
    #[must_use]
    pub fn of(value: ValueRef<'a>) -> Option<Self> {
        value
            .as_array()
            .map(Container::Array)
            .or_else(|| value.as_object().map(Container::Object))
    }

    /// Number of elements or entries.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Container::Array(a) => a.len(),
            Container::Object(o) => o.len(),
        }
    }

    /// Whether the container is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `Array` or `Object`.
    #[must_use]
    pub fn value_type(&self) -> ValueType {
        match self {
            Container::Array(_) => ValueType::Array,
            Container::Object(_) => ValueType::Object,
        }
    }

    /// The value in the slot named by `component`.
    #[must_use]
    pub fn child(&self, component: &PathComponent) -> Option<ValueRef<'a>> {
        match (self, component) {
            (Container::Array(a), PathComponent::Index(i)) => a.get(*i),
            (Container::Object(o), PathComponent::Key(k)) => o.get(k),
            _ => None,
        }
    }

    /// The value at `path` below this container, or `None` if any component
    /// is missing or names the wrong kind of container.
    #[must_use]
    pub fn get(&self, path: &[PathComponent]) -> Option<ValueRef<'a>> {
        let (first, rest) = path.split_first()?;
        let mut current = self.child(first)?;
        for component in rest {
            current = Container::of(current)?.child(component)?;
        }
        Some(current)
    }

    /// Copies the container out.
    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            Container::Array(a) => Value::Array(a.to_vec()),
            Container::Object(o) => Value::Object(o.to_map()),
        }
    }
}

#[derive(Clone, Copy)]
enum Edit<'v> {
    Insert(&'v Value),
    Replace(&'v Value),
    Remove,
}

impl Document {
    /// An empty document whose root is an array.
    #[must_use]
    pub fn new_array() -> Self {
        Self::empty(false)
    }

    /// An empty document whose root is an object.
    #[must_use]
    pub fn new_object() -> Self {
        Self::empty(true)
    }

    fn empty(is_object: bool) -> Self {
        let mut bytes = vec![0u8; HEADER_SIZE + BASE_SIZE];
        write_u32(&mut bytes, 0, TAG);
        write_u32(&mut bytes, 4, VERSION);
        Header::empty(is_object).write(&mut bytes[HEADER_SIZE..]);
        Self {
            bytes,
            compaction_counter: 0,
            options: DocumentOptions::default(),
        }
    }

    /// Replaces the document's options.
    #[must_use]
    pub fn with_options(mut self, options: DocumentOptions) -> Self {
        self.options = options;
        self
    }

    /// The document's options.
    #[must_use]
    pub fn options(&self) -> &DocumentOptions {
        &self.options
    }

    /// Encodes an array or object value as a new document.
    ///
    /// # Errors
    ///
    /// [`MutationError::NotAContainer`] if `value` is a scalar, or any error
    /// raised while inserting its contents.
    pub fn from_value(value: &Value) -> Result<Self, MutationError> {
        Self::build(value, 0)
    }

    /// Builds a document for a container that will sit at nesting `depth`.
    pub(crate) fn build(value: &Value, depth: usize) -> Result<Self, MutationError> {
        match value {
            Value::Array(items) => {
                let mut doc = Self::new_array();
                for (i, item) in items.iter().enumerate() {
                    doc.insert_at_index(i, &Prepared::new(item, depth + 1)?, false)?;
                }
                Ok(doc)
            }
            Value::Object(map) => {
                let mut doc = Self::new_object();
                for (key, item) in map {
                    doc.insert_at_key(key, &Prepared::new(item, depth + 1)?)?;
                }
                Ok(doc)
            }
            _ => Err(MutationError::NotAContainer),
        }
    }

    /// Wraps a copy of an encoded container in a fresh document.
    fn from_container(container: &[u8], options: DocumentOptions) -> Self {
        let mut bytes = Vec::with_capacity(HEADER_SIZE + container.len());
        bytes.extend_from_slice(&TAG.to_le_bytes());
        bytes.extend_from_slice(&VERSION.to_le_bytes());
        bytes.extend_from_slice(container);
        Self {
            bytes,
            compaction_counter: 0,
            options,
        }
    }

    /// Validates `bytes` and adopts a copy of them.
    ///
    /// Trailing bytes after the root container are ignored.
    ///
    /// # Errors
    ///
    /// A [`LoadError`] describing the first problem found. Nothing in the
    /// buffer is navigated before it has been fully validated.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, LoadError> {
        let root_size = validate::check(bytes).inspect_err(|err| {
            tracing::debug!(%err, len = bytes.len(), "rejected document buffer");
        })?;
        Ok(Self {
            bytes: bytes[..HEADER_SIZE + root_size].to_vec(),
            compaction_counter: 0,
            options: DocumentOptions::default(),
        })
    }

    /// Validates `bytes` and navigates them in place, without copying.
    ///
    /// The view borrows `bytes`, so a memory-mapped or received buffer can be
    /// read directly. Use [`Document::from_bytes`] to edit it.
    ///
    /// ```
    /// use jsonblob::{Container, Document, Value, path};
    ///
    /// let bytes = Document::from_value(&Value::Array(vec![Value::from("x")]))
    ///     .unwrap()
    ///     .into_bytes();
    /// let root = Document::view(&bytes).unwrap();
    /// assert!(matches!(root, Container::Array(_)));
    /// assert_eq!(root.get(&path![0]).and_then(|v| v.as_string()).as_deref(), Some("x"));
    /// ```
    ///
    /// # Errors
    ///
    /// As [`Document::from_bytes`].
    pub fn view(bytes: &[u8]) -> Result<Container<'_>, LoadError> {
        let root_size = validate::check(bytes).inspect_err(|err| {
            tracing::debug!(%err, len = bytes.len(), "rejected document buffer");
        })?;
        let root = &bytes[HEADER_SIZE..HEADER_SIZE + root_size];
        Ok(if Header::read(root).is_object {
            Container::Object(ObjectRef::new(root))
        } else {
            Container::Array(ArrayRef::new(root))
        })
    }

    /// The raw buffer, including any dead bytes left by earlier edits.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Compacts the document and returns a copy of its buffer. A buffer that
    /// cannot be compacted (see [`Document::compact`]) is returned as it is.
    pub fn to_bytes(&mut self) -> Vec<u8> {
        // the uncompacted buffer is still a valid document
        let _ = self.compact();
        self.bytes.clone()
    }

    /// Compacts the document and returns its buffer, as
    /// [`Document::to_bytes`].
    #[must_use]
    pub fn into_bytes(mut self) -> Vec<u8> {
        let _ = self.compact();
        self.bytes
    }

    pub(crate) fn root_bytes(&self) -> &[u8] {
        &self.bytes[HEADER_SIZE..]
    }

    fn header(&self) -> Header {
        Header::read(self.root_bytes())
    }

    /// The root container.
    #[must_use]
    pub fn root(&self) -> Container<'_> {
        if self.header().is_object {
            Container::Object(ObjectRef::new(self.root_bytes()))
        } else {
            Container::Array(ArrayRef::new(self.root_bytes()))
        }
    }

    /// The root array, if the root is an array.
    #[must_use]
    pub fn as_array(&self) -> Option<ArrayRef<'_>> {
        match self.root() {
            Container::Array(a) => Some(a),
            Container::Object(_) => None,
        }
    }

    /// The root object, if the root is an object.
    #[must_use]
    pub fn as_object(&self) -> Option<ObjectRef<'_>> {
        match self.root() {
            Container::Object(o) => Some(o),
            Container::Array(_) => None,
        }
    }

    /// Whether the root is an object.
    #[must_use]
    pub fn is_object(&self) -> bool {
        self.header().is_object
    }

    /// Number of elements or entries in the root.
    #[must_use]
    pub fn len(&self) -> usize {
        self.header().len()
    }

    /// Whether the root is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Size of the buffer in bytes.
    #[must_use]
    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    /// Number of edits that left dead bytes behind since the last compaction.
    #[must_use]
    pub fn compaction_counter(&self) -> u32 {
        self.compaction_counter
    }

    /// Runs the full validator over the document's own buffer.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        validate::validate(&self.bytes)
    }

    /// Copies the whole document out.
    #[must_use]
    pub fn to_value(&self) -> Value {
        self.root().to_value()
    }

    /// The value at `path`, or `None` if any component is missing or names
    /// the wrong kind of container. The empty path has no value cell and
    /// yields `None`; use [`Document::root`] for the root.
    #[must_use]
    pub fn get(&self, path: &[PathComponent]) -> Option<ValueRef<'_>> {
        self.root().get(path)
    }

    /// Copies out the value at `path`. A missing path is logged and yields
    /// [`Value::Null`].
    #[must_use]
    pub fn value_at(&self, path: &[PathComponent]) -> Value {
        if path.is_empty() {
            return self.to_value();
        }
        if let Some(value) = self.get(path) {
            value.to_value()
        } else {
            tracing::warn!(path = %DisplayPath(path), "no value at path");
            Value::Null
        }
    }

    /// Appends to the root array.
    ///
    /// # Errors
    ///
    /// See [`Document::insert`].
    pub fn push(&mut self, value: &Value) -> Result<(), MutationError> {
        self.insert(self.len(), value)
    }

    /// Inserts into the root array at `index`, shifting later elements.
    ///
    /// # Errors
    ///
    /// [`MutationError::TypeMismatch`] if the root is an object,
    /// [`MutationError::IndexOutOfBounds`] if `index > len()`, or
    /// [`MutationError::CapacityExceeded`] if the root would grow too large.
    pub fn insert(&mut self, index: usize, value: &Value) -> Result<(), MutationError> {
        self.apply(&PathComponent::Index(index), Edit::Insert(value), 0)
    }

    /// Replaces the element of the root array at `index`.
    ///
    /// # Errors
    ///
    /// As [`Document::insert`], with `index < len()` required.
    pub fn replace(&mut self, index: usize, value: &Value) -> Result<(), MutationError> {
        self.apply(&PathComponent::Index(index), Edit::Replace(value), 0)
    }

    /// Removes the element of the root array at `index`.
    ///
    /// # Errors
    ///
    /// [`MutationError::TypeMismatch`] or [`MutationError::IndexOutOfBounds`].
    pub fn remove(&mut self, index: usize) -> Result<(), MutationError> {
        self.apply(&PathComponent::Index(index), Edit::Remove, 0)
    }

    /// Inserts `key` into the root object, replacing any existing value.
    ///
    /// # Errors
    ///
    /// [`MutationError::TypeMismatch`] if the root is an array, or
    /// [`MutationError::CapacityExceeded`] if the root would grow too large.
    pub fn insert_key(&mut self, key: &str, value: &Value) -> Result<(), MutationError> {
        self.apply(&PathComponent::Key(key.into()), Edit::Insert(value), 0)
    }

    /// Removes `key` from the root object.
    ///
    /// # Errors
    ///
    /// [`MutationError::TypeMismatch`] or [`MutationError::KeyNotFound`].
    pub fn remove_key(&mut self, key: &str) -> Result<(), MutationError> {
        self.apply(&PathComponent::Key(key.into()), Edit::Remove, 0)
    }

    /// Inserts `value` at `path`. For an index the value is inserted before
    /// the current occupant; for a key it is inserted or replaced.
    ///
    /// # Errors
    ///
    /// [`MutationError::EmptyPath`], a lookup error for the containers along
    /// the path, or any error of the final insert.
    pub fn insert_at(&mut self, path: &[PathComponent], value: &Value) -> Result<(), MutationError> {
        self.edit(path, Edit::Insert(value), 0)
    }

    /// Replaces the existing value at `path`.
    ///
    /// # Errors
    ///
    /// As [`Document::insert_at`], and the slot must already exist.
    pub fn replace_at(&mut self, path: &[PathComponent], value: &Value) -> Result<(), MutationError> {
        self.edit(path, Edit::Replace(value), 0)
    }

    /// Removes the value at `path`.
    ///
    /// # Errors
    ///
    /// As [`Document::insert_at`], and the slot must already exist.
    pub fn remove_at(&mut self, path: &[PathComponent]) -> Result<(), MutationError> {
        self.edit(path, Edit::Remove, 0)
    }

    fn edit(&mut self, path: &[PathComponent], edit: Edit<'_>, depth: usize) -> Result<(), MutationError> {
        match path.split_first() {
            None => Err(MutationError::EmptyPath),
            Some((last, [])) => self.apply(last, edit, depth),
            Some((first, rest)) => {
                let child = self.locate(first)?;
                let bytes = child.container_bytes().ok_or(MutationError::NotAContainer)?;
                let mut child = Document::from_container(bytes, self.options);
                child.edit(rest, edit, depth + 1)?;
                child.compact()?;
                let prepared = Prepared::container(child.root_bytes(), child.is_object());
                match first {
                    PathComponent::Index(i) => self.insert_at_index(*i, &prepared, true),
                    PathComponent::Key(k) => self.insert_at_key(k, &prepared),
                }
            }
        }
    }

    /// Looks up an existing slot of the root container.
    fn locate(&self, component: &PathComponent) -> Result<ValueRef<'_>, MutationError> {
        self.expect_kind(component)?;
        match (self.root(), component) {
            (Container::Array(a), PathComponent::Index(i)) => {
                a.get(*i).ok_or(MutationError::IndexOutOfBounds {
                    index: *i,
                    len: a.len(),
                })
            }
            (Container::Object(o), PathComponent::Key(k)) => {
                o.get(k).ok_or_else(|| MutationError::KeyNotFound(k.clone()))
            }
            _ => Err(MutationError::NotAContainer),
        }
    }

    fn expect_kind(&self, component: &PathComponent) -> Result<(), MutationError> {
        let expected = match component {
            PathComponent::Key(_) => ValueType::Object,
            PathComponent::Index(_) => ValueType::Array,
        };
        let found = self.root().value_type();
        if expected == found {
            Ok(())
        } else {
            Err(MutationError::TypeMismatch { expected, found })
        }
    }

    /// Applies an edit to a slot of the root container. `depth` is the
    /// nesting depth of the root within the document being edited.
    fn apply(&mut self, component: &PathComponent, edit: Edit<'_>, depth: usize) -> Result<(), MutationError> {
        self.expect_kind(component)?;
        match (component, edit) {
            (PathComponent::Index(i), Edit::Insert(value)) => {
                self.check_index(*i, self.len() + 1)?;
                self.insert_at_index(*i, &Prepared::new(value, depth + 1)?, false)
            }
            (PathComponent::Index(i), Edit::Replace(value)) => {
                self.check_index(*i, self.len())?;
                self.insert_at_index(*i, &Prepared::new(value, depth + 1)?, true)
            }
            (PathComponent::Index(i), Edit::Remove) => {
                self.check_index(*i, self.len())?;
                self.remove_slot(*i);
                Ok(())
            }
            (PathComponent::Key(k), Edit::Insert(value)) => {
                self.insert_at_key(k, &Prepared::new(value, depth + 1)?)
            }
            (PathComponent::Key(k), Edit::Replace(value)) => {
                self.locate(component)?;
                self.insert_at_key(k, &Prepared::new(value, depth + 1)?)
            }
            (PathComponent::Key(k), Edit::Remove) => {
                let (pos, exists) = self
                    .as_object()
                    .map_or((0, false), |o| o.index_of(k));
                if !exists {
                    return Err(MutationError::KeyNotFound(k.clone()));
                }
                self.remove_slot(pos);
                Ok(())
            }
        }
    }

    fn check_index(&self, index: usize, bound: usize) -> Result<(), MutationError> {
        if index < bound {
            Ok(())
        } else {
            Err(MutationError::IndexOutOfBounds {
                index,
                len: self.len(),
            })
        }
    }

    /// Writes a prepared value into the root array at `index`, either in a
    /// new slot or over the existing one.
    fn insert_at_index(&mut self, index: usize, value: &Prepared, replace: bool) -> Result<(), MutationError> {
        let value_offset = base::reserve_space(
            &mut self.bytes,
            HEADER_SIZE,
            value.required_storage(),
            index,
            1,
            replace,
        )?;
        let slot = HEADER_SIZE + self.header().table() + index * SLOT_SIZE;
        write_u32(&mut self.bytes, slot, value.cell(value_offset, false).raw());
        value.copy_data(&mut self.bytes[HEADER_SIZE + value_offset..]);
        if replace {
            self.record_dead_bytes();
        }
        Ok(())
    }

    /// Writes a prepared value into the root object under `key`, keeping the
    /// table in key order.
    fn insert_at_key(&mut self, key: &str, value: &Prepared) -> Result<(), MutationError> {
        let (pos, exists) = self.as_object().map_or((0, false), |o| o.index_of(key));
        let latin_key = string::use_compressed(key);
        let value_offset = SLOT_SIZE + string::encoded_size(key, latin_key);
        let off = base::reserve_space(
            &mut self.bytes,
            HEADER_SIZE,
            value_offset + value.required_storage(),
            pos,
            1,
            exists,
        )?;
        let entry = HEADER_SIZE + off;
        write_u32(&mut self.bytes, entry, value.cell(off + value_offset, latin_key).raw());
        string::write_string(&mut self.bytes[entry + SLOT_SIZE..], key, latin_key);
        value.copy_data(&mut self.bytes[entry + value_offset..]);
        if exists {
            self.record_dead_bytes();
        }
        Ok(())
    }

    fn remove_slot(&mut self, pos: usize) {
        base::remove_items(&mut self.bytes, HEADER_SIZE, pos, 1);
        if self.is_empty() {
            // nothing is reachable, so every payload byte is dead
            let is_object = self.is_object();
            self.bytes.truncate(HEADER_SIZE + BASE_SIZE);
            Header::empty(is_object).write(&mut self.bytes[HEADER_SIZE..]);
            self.compaction_counter = 0;
        } else {
            self.record_dead_bytes();
        }
    }

    fn record_dead_bytes(&mut self) {
        self.compaction_counter = self.compaction_counter.saturating_add(1);
        if self.options.should_compact(self.compaction_counter, self.len()) {
            // a refusal is logged; the edit itself already succeeded
            let _ = self.compact();
        }
    }

    /// Rewrites the buffer so that it holds only reachable bytes.
    ///
    /// A no-op when no edit has left dead bytes behind since the last
    /// compaction. Nested containers are copied as they are; they are always
    /// compact when they are written into their parent.
    ///
    /// Every value is copied once per slot referring to it. A loaded buffer
    /// whose slots share one payload can therefore grow when compacted.
    ///
    /// # Errors
    ///
    /// [`MutationError::CapacityExceeded`] if the compacted root would be
    /// larger than [`MAX_SIZE`](crate::MAX_SIZE). The buffer is unchanged.
    pub fn compact(&mut self) -> Result<(), MutationError> {
        if self.compaction_counter == 0 {
            return Ok(());
        }
        let old = self.root_bytes();
        let header = self.header();
        let root = self.root();
        let reserve: usize = match root {
            Container::Object(o) => o.iter().map(|e| e.used_storage()).sum(),
            Container::Array(a) => a.iter().map(|v| v.used_storage()).sum(),
        };
        let size = BASE_SIZE + reserve + header.len() * SLOT_SIZE;
        if size > MAX_SIZE {
            tracing::warn!(
                size = header.size,
                compacted = size,
                max = MAX_SIZE,
                "compacted document would be too large"
            );
            return Err(MutationError::CapacityExceeded {
                size: header.size as usize,
                requested: size.saturating_sub(header.size as usize),
            });
        }

        let mut bytes = vec![0u8; HEADER_SIZE + size];
        write_u32(&mut bytes, 0, TAG);
        write_u32(&mut bytes, 4, VERSION);
        let new_header = Header {
            size: to_u32(size),
            is_object: header.is_object,
            length: header.length,
            table_offset: to_u32(BASE_SIZE + reserve),
        };
        let dst = &mut bytes[HEADER_SIZE..];
        new_header.write(dst);
        let table = new_header.table();

        let mut offset = BASE_SIZE;
        match root {
            Container::Object(o) => {
                for (i, e) in o.iter().enumerate() {
                    write_u32(dst, table + i * SLOT_SIZE, to_u32(offset));
                    let entry_size = e.size();
                    dst[offset..offset + entry_size]
                        .copy_from_slice(&old[e.offset()..e.offset() + entry_size]);
                    let entry_at = offset;
                    offset += entry_size;
                    let data_size = e.value().used_storage();
                    if data_size > 0 {
                        let from = e.cell().value() as usize;
                        dst[offset..offset + data_size].copy_from_slice(&old[from..from + data_size]);
                        write_u32(dst, entry_at, e.cell().with_value(to_u32(offset)).raw());
                        offset += data_size;
                    }
                }
            }
            Container::Array(a) => {
                for i in 0..a.len() {
                    let mut cell = a.cell_at(i);
                    let data_size = cell.used_storage(a.bytes());
                    if data_size > 0 {
                        let from = cell.value() as usize;
                        dst[offset..offset + data_size].copy_from_slice(&old[from..from + data_size]);
                        cell = cell.with_value(to_u32(offset));
                        offset += data_size;
                    }
                    write_u32(dst, table + i * SLOT_SIZE, cell.raw());
                }
            }
        }
        debug_assert_eq!(offset, table);

        tracing::debug!(
            before = self.bytes.len(),
            after = bytes.len(),
            dead_edits = self.compaction_counter,
            "compacted document"
        );
        self.bytes = bytes;
        self.compaction_counter = 0;
        Ok(())
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("root", &self.root())
            .field("size", &self.size())
            .field("compaction_counter", &self.compaction_counter)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use alloc::{string::ToString, vec};

    use super::*;
    use crate::{Map, path};

    fn object(pairs: &[(&str, Value)]) -> Value {
        Value::Object(
            pairs
                .iter()
                .map(|(k, v)| ((*k).to_string(), v.clone()))
                .collect::<Map>(),
        )
    }

    #[test]
    fn empty_documents_are_valid() {
        for doc in [Document::new_array(), Document::new_object()] {
            assert!(doc.is_valid());
            assert!(doc.is_empty());
            assert_eq!(doc.size(), HEADER_SIZE + BASE_SIZE);
        }
        assert!(Document::new_object().is_object());
        assert!(!Document::new_array().is_object());
    }

    #[test]
    fn scalars_cannot_be_documents() {
        assert_eq!(
            Document::from_value(&Value::from(1)).unwrap_err(),
            MutationError::NotAContainer
        );
    }

    #[test]
    fn array_edits() {
        let mut doc = Document::new_array();
        doc.push(&Value::from("b")).unwrap();
        doc.insert(0, &Value::from("a")).unwrap();
        doc.push(&Value::from(3)).unwrap();
        assert_eq!(doc.to_value().to_string(), r#"["a","b",3]"#);

        doc.replace(1, &Value::from(true)).unwrap();
        assert_eq!(doc.compaction_counter(), 1);
        doc.remove(0).unwrap();
        assert_eq!(doc.compaction_counter(), 2);
        assert_eq!(doc.to_value().to_string(), "[true,3]");
        assert!(doc.is_valid());

        assert_eq!(
            doc.insert(5, &Value::Null).unwrap_err(),
            MutationError::IndexOutOfBounds { index: 5, len: 2 }
        );
        assert_eq!(
            doc.replace(2, &Value::Null).unwrap_err(),
            MutationError::IndexOutOfBounds { index: 2, len: 2 }
        );
        assert_eq!(
            doc.insert_key("k", &Value::Null).unwrap_err(),
            MutationError::TypeMismatch {
                expected: ValueType::Object,
                found: ValueType::Array
            }
        );
    }

    #[test]
    fn object_edits() {
        let mut doc = Document::new_object();
        doc.insert_key("b", &Value::from(1)).unwrap();
        doc.insert_key("a", &Value::from(2)).unwrap();
        assert_eq!(doc.compaction_counter(), 0);
        doc.insert_key("a", &Value::from("two")).unwrap();
        assert_eq!(doc.compaction_counter(), 1);
        assert_eq!(doc.to_value().to_string(), r#"{"a":"two","b":1}"#);

        assert_eq!(
            doc.remove_key("zzz").unwrap_err(),
            MutationError::KeyNotFound("zzz".to_string())
        );
        assert_eq!(
            doc.push(&Value::Null).unwrap_err(),
            MutationError::TypeMismatch {
                expected: ValueType::Array,
                found: ValueType::Object
            }
        );
    }

    #[test]
    fn removing_the_last_element_resets_the_root() {
        let mut doc = Document::new_object();
        doc.insert_key("big", &Value::from("x".repeat(100))).unwrap();
        doc.remove_key("big").unwrap();
        assert_eq!(doc.size(), HEADER_SIZE + BASE_SIZE);
        assert_eq!(doc.compaction_counter(), 0);
        assert!(doc.is_valid());
        assert!(doc.is_object());
    }

    #[test]
    fn compaction_reclaims_dead_bytes() {
        let mut doc = Document::new_array();
        doc.push(&Value::from("a long string that will be replaced")).unwrap();
        doc.push(&Value::from(0.5)).unwrap();
        doc.replace(0, &Value::from("short")).unwrap();
        let before = doc.size();
        let expected = doc.to_value();

        doc.compact().unwrap();
        assert!(doc.size() < before);
        assert_eq!(doc.compaction_counter(), 0);
        assert_eq!(doc.to_value(), expected);
        assert!(doc.is_valid());

        let once = doc.as_bytes().to_vec();
        doc.compact().unwrap();
        assert_eq!(doc.as_bytes(), &once[..]);
    }

    #[test]
    fn compaction_rewrites_object_payloads() {
        let mut doc = Document::new_object();
        doc.insert_key("x", &Value::from(1.25)).unwrap();
        doc.insert_key("y", &Value::from(vec![Value::from("nested")])).unwrap();
        doc.insert_key("x", &Value::from(2.25)).unwrap();
        let expected = doc.to_value();
        let fresh = Document::from_value(&expected).unwrap();

        doc.compact().unwrap();
        assert_eq!(doc.to_value(), expected);
        assert_eq!(doc.size(), fresh.size());
        assert!(doc.is_valid());
    }

    #[test]
    fn heuristic_compaction_kicks_in() {
        let mut doc = Document::new_array().with_options(DocumentOptions {
            compaction_threshold: 4,
            ..Default::default()
        });
        doc.push(&Value::from(0.5)).unwrap();
        for i in 0..5 {
            doc.replace(0, &Value::from(f64::from(i) + 0.5)).unwrap();
        }
        assert_eq!(doc.compaction_counter(), 0, "fifth replace triggers compaction");
        assert_eq!(doc.value_at(&path![0]), Value::from(4.5));

        let mut manual = Document::new_array().with_options(DocumentOptions {
            compaction_threshold: 0,
            auto_compact: false,
        });
        manual.push(&Value::Null).unwrap();
        manual.replace(0, &Value::from(true)).unwrap();
        manual.replace(0, &Value::from(false)).unwrap();
        assert_eq!(manual.compaction_counter(), 2);
    }

    #[test]
    fn nested_edits_through_paths() {
        let mut doc = Document::from_value(&object(&[
            ("users", Value::Array(vec![object(&[("name", Value::from("Ada"))])])),
            ("count", Value::from(1)),
        ]))
        .unwrap();

        doc.insert_at(&path!["users", 0, "id"], &Value::from(7)).unwrap();
        doc.insert_at(&path!["users", 1], &object(&[("name", Value::from("Grace"))]))
            .unwrap();
        doc.replace_at(&path!["count"], &Value::from(2)).unwrap();
        doc.remove_at(&path!["users", 0, "name"]).unwrap();

        assert_eq!(
            doc.to_value().to_string(),
            r#"{"count":2,"users":[{"id":7},{"name":"Grace"}]}"#
        );
        assert!(doc.is_valid());
        assert_eq!(
            doc.get(&path!["users", 1, "name"]).and_then(|v| v.as_string()),
            Some("Grace".to_string())
        );
    }

    #[test]
    fn failed_nested_edits_change_nothing() {
        let mut doc = Document::from_value(&object(&[("list", Value::Array(vec![]))])).unwrap();
        let before = doc.as_bytes().to_vec();

        assert_eq!(
            doc.insert_at(&path!["list", 3], &Value::Null).unwrap_err(),
            MutationError::IndexOutOfBounds { index: 3, len: 0 }
        );
        assert_eq!(
            doc.insert_at(&path!["missing", 0], &Value::Null).unwrap_err(),
            MutationError::KeyNotFound("missing".to_string())
        );
        assert_eq!(
            doc.remove_at(&path!["list", "k"]).unwrap_err(),
            MutationError::TypeMismatch {
                expected: ValueType::Object,
                found: ValueType::Array
            }
        );
        assert_eq!(doc.insert_at(&[], &Value::Null).unwrap_err(), MutationError::EmptyPath);
        assert_eq!(
            doc.replace_at(&path!["nope"], &Value::Null).unwrap_err(),
            MutationError::KeyNotFound("nope".to_string())
        );
        assert_eq!(doc.as_bytes(), &before[..]);
    }

    #[test]
    fn scalars_along_a_path_are_not_containers() {
        let mut doc = Document::from_value(&object(&[("n", Value::from(1))])).unwrap();
        assert_eq!(
            doc.insert_at(&path!["n", 0], &Value::Null).unwrap_err(),
            MutationError::NotAContainer
        );
    }

    #[test]
    fn missing_paths_read_as_null() {
        let doc = Document::from_value(&object(&[("a", Value::from(1))])).unwrap();
        assert_eq!(doc.value_at(&path!["b"]), Value::Null);
        assert_eq!(doc.value_at(&path!["a"]), Value::from(1));
        assert_eq!(doc.value_at(&[]), doc.to_value());
        assert!(doc.get(&[]).is_none());
    }

    #[test]
    fn deep_nesting_is_refused() {
        let mut value = Value::Array(vec![]);
        for _ in 0..crate::MAX_DEPTH + 1 {
            value = Value::Array(vec![value]);
        }
        assert_eq!(Document::from_value(&value).unwrap_err(), MutationError::TooDeep);
    }

    #[test]
    fn debug_output_shows_contents() {
        let doc = Document::from_value(&object(&[("k", Value::from(true))])).unwrap();
        let text = alloc::format!("{doc:?}");
        assert!(text.contains("Latin1(\"k\")"), "{text}");
        assert!(text.contains("Boolean(true)"), "{text}");
    }
}
