use alloc::string::String;

use thiserror::Error;

use crate::cell::ValueType;

/// Why a byte buffer could not be adopted as a document.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    #[error("buffer of {len} bytes is too short to hold a document")]
    TooShort { len: usize },
    #[error("bad format tag {0:#010x}")]
    BadTag(u32),
    #[error("unsupported format version {0}")]
    BadVersion(u32),
    #[error("root container declares {declared} bytes but only {available} are available")]
    Truncated { declared: usize, available: usize },
    #[error("malformed document structure")]
    Malformed,
}

/// Why an edit was refused. A refused edit leaves the document unchanged.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MutationError {
    #[error("container of {size} bytes cannot grow by {requested} bytes")]
    CapacityExceeded { size: usize, requested: usize },
    #[error("index {index} out of range for length {len}")]
    IndexOutOfBounds { index: usize, len: usize },
    #[error("key {0:?} not found")]
    KeyNotFound(String),
    #[error("value is not an array or object")]
    NotAContainer,
    #[error("expected {expected}, found {found}")]
    TypeMismatch {
        expected: ValueType,
        found: ValueType,
    },
    #[error("path is empty")]
    EmptyPath,
    #[error("containers nested too deeply")]
    TooDeep,
}
