//! A compact, relocatable binary JSON document format.
//!
//! A [`Document`] is one contiguous little-endian buffer: an 8-byte header
//! (`"qbjs"` and a version) followed by a single root array or object. All
//! references inside the buffer are relative offsets, so the bytes can be
//! written out, mapped back in and navigated without parsing. Small integers
//! and Latin-1 strings are stored in compressed form, and object keys are
//! kept sorted so lookups are a binary search.
//!
//! Documents are edited in place. Edits append new payload and leave the old
//! bytes behind; [`Document::compact`] (run automatically after enough dead
//! bytes build up) rewrites the buffer without them.
//!
//! ```rust
//! use jsonblob::{Document, Value, path, validate};
//!
//! let mut doc = Document::new_object();
//! doc.insert_key("name", &Value::from("jsonblob")).unwrap();
//! doc.insert_key("tags", &Value::Array(vec![Value::from("binary")])).unwrap();
//! doc.insert_at(&path!["tags", 1], &Value::from("json")).unwrap();
//!
//! let bytes = doc.into_bytes();
//! assert!(validate(&bytes));
//! let doc = Document::from_bytes(&bytes).unwrap();
//! assert_eq!(doc.value_at(&path!["tags", 1]), Value::from("json"));
//! ```

#![no_std]
#![allow(missing_docs)]
extern crate alloc;

#[cfg(test)]
extern crate std;

mod array;
mod base;
mod cell;
mod document;
mod error;
mod layout;
mod object;
mod options;
mod path;
mod shared;
mod string;
mod validate;
mod value;

#[cfg(test)]
mod tests;

pub use array::ArrayRef;
pub use cell::{ValueRef, ValueType};
pub use document::{Container, Document};
pub use error::{LoadError, MutationError};
pub use layout::{MAX_DEPTH, MAX_SIZE, TAG, VERSION};
pub use object::{Entry, ObjectRef};
pub use options::DocumentOptions;
pub use path::{PathComponent, PathComponentFrom};
pub use shared::SharedDocument;
pub use string::StrRef;
pub use validate::validate;
pub use value::{Array, Map, Value};

#[doc(hidden)]
pub use alloc::vec;

/// Macro to build a `Vec<PathComponent>` from a heterogeneous list of keys and
/// indices.
///
/// ```rust
/// extern crate alloc;
/// # use jsonblob::{path, PathComponent};
/// let p = path![0, "foo", 2];
/// assert_eq!(
///     p,
///     vec![
///         PathComponent::Index(0),
///         PathComponent::Key("foo".into()),
///         PathComponent::Index(2)
///     ]
/// );
/// ```
#[macro_export]
macro_rules! path {
    ( $( $elem:expr ),* $(,)? ) => {{
        use $crate::PathComponentFrom;
        $crate::vec![$($crate::PathComponent::from_path_component($elem)),*]
    }};
}
