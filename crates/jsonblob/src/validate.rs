//! Structural validation of untrusted buffers.
//!
//! Every read here is bounds-checked, so arbitrary input yields `false` or a
//! [`LoadError`] and never a panic. Only buffers that pass are ever navigated
//! with the unchecked accessors.

use crate::{
    array,
    base::Header,
    error::LoadError,
    layout::{BASE_SIZE, HEADER_SIZE, TAG, VERSION, read_u32},
    object,
};

/// Whether `bytes` holds a well-formed document.
///
/// ```
/// use jsonblob::{Document, validate};
///
/// assert!(validate(Document::new_array().as_bytes()));
/// assert!(!validate(b"qbjs"));
/// ```
#[must_use]
pub fn validate(bytes: &[u8]) -> bool {
    check(bytes).is_ok()
}

/// Validates `bytes` and returns the size of its root container.
pub(crate) fn check(bytes: &[u8]) -> Result<usize, LoadError> {
    if bytes.len() < HEADER_SIZE + BASE_SIZE {
        return Err(LoadError::TooShort { len: bytes.len() });
    }
    let tag = read_u32(bytes, 0);
    if tag != TAG {
        return Err(LoadError::BadTag(tag));
    }
    let version = read_u32(bytes, 4);
    if version != VERSION {
        return Err(LoadError::BadVersion(version));
    }

    let root = &bytes[HEADER_SIZE..];
    let header = Header::read(root);
    let declared = header.size as usize;
    if declared > root.len() {
        return Err(LoadError::Truncated {
            declared,
            available: root.len(),
        });
    }
    let valid = if header.is_object {
        object::is_valid(root, declared, 0)
    } else {
        array::is_valid(root, declared, 0)
    };
    if valid { Ok(declared) } else { Err(LoadError::Malformed) }
}
