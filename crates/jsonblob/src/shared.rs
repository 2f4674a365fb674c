use alloc::sync::Arc;
use core::ops::Deref;

use crate::document::Document;

/// A cheaply clonable handle to a [`Document`].
///
/// Clones share one buffer until one of them asks for mutable access, at
/// which point that handle gets a private copy. Other handles never observe
/// the edit.
///
/// ```
/// use jsonblob::{Document, SharedDocument, Value};
///
/// let a = SharedDocument::new(Document::new_array());
/// let mut b = a.clone();
/// b.make_mut().push(&Value::Null).unwrap();
/// assert_eq!(a.len(), 0);
/// assert_eq!(b.len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct SharedDocument {
    inner: Arc<Document>,
}

impl SharedDocument {
    #[must_use]
    pub fn new(doc: Document) -> Self {
        Self { inner: Arc::new(doc) }
    }

    /// Whether another handle currently shares this buffer.
    #[must_use]
    pub fn is_shared(&self) -> bool {
        Arc::strong_count(&self.inner) > 1
    }

    /// Mutable access, detaching from other handles first.
    pub fn make_mut(&mut self) -> &mut Document {
        if self.is_shared() {
            tracing::trace!(size = self.inner.size(), "detaching shared document");
        }
        Arc::make_mut(&mut self.inner)
    }

    /// Unwraps the document, copying it if it is still shared.
    #[must_use]
    pub fn into_inner(self) -> Document {
        Arc::unwrap_or_clone(self.inner)
    }
}

impl Deref for SharedDocument {
    type Target = Document;

    fn deref(&self) -> &Document {
        &self.inner
    }
}

impl From<Document> for SharedDocument {
    fn from(doc: Document) -> Self {
        Self::new(doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Value;

    #[test]
    fn edits_detach_from_other_handles() {
        let mut original = Document::new_object();
        original.insert_key("k", &Value::from(1)).unwrap();
        let first = SharedDocument::new(original);
        let mut second = first.clone();
        assert!(first.is_shared());

        second.make_mut().insert_key("k", &Value::from(2)).unwrap();
        assert!(!first.is_shared());
        assert!(!second.is_shared());
        assert_eq!(first.value_at(&crate::path!["k"]), Value::from(1));
        assert_eq!(second.value_at(&crate::path!["k"]), Value::from(2));
    }

    #[test]
    fn unshared_handles_edit_in_place() {
        let mut handle = SharedDocument::from(Document::new_array());
        let before = core::ptr::from_ref(&*handle);
        handle.make_mut().push(&Value::from(true)).unwrap();
        assert_eq!(core::ptr::from_ref(&*handle), before);
        assert_eq!(handle.into_inner().len(), 1);
    }
}
