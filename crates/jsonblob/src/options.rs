/// Configuration for a [`Document`](crate::Document).
///
/// These options control when the document reclaims the dead bytes that
/// replacing and removing values leave behind.
///
/// # Examples
///
/// ```rust
/// use jsonblob::{Document, DocumentOptions};
///
/// let doc = Document::new_object().with_options(DocumentOptions {
///     compaction_threshold: 8,
///     ..Default::default()
/// });
/// assert_eq!(doc.options().compaction_threshold, 8);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocumentOptions {
    /// Number of dead-byte producing edits tolerated before the document
    /// compacts itself.
    ///
    /// A counted edit triggers compaction once the counter exceeds this
    /// threshold and is at least half the root container's length.
    ///
    /// # Default
    ///
    /// `32`
    pub compaction_threshold: u32,

    /// Whether edits may trigger compaction on their own.
    ///
    /// When `false`, dead bytes accumulate until [`Document::compact`] or
    /// [`Document::to_bytes`] is called.
    ///
    /// [`Document::compact`]: crate::Document::compact
    /// [`Document::to_bytes`]: crate::Document::to_bytes
    ///
    /// # Default
    ///
    /// `true`
    pub auto_compact: bool,
}

impl Default for DocumentOptions {
    fn default() -> Self {
        Self {
            compaction_threshold: 32,
            auto_compact: true,
        }
    }
}

impl DocumentOptions {
    pub(crate) fn should_compact(&self, counter: u32, length: usize) -> bool {
        self.auto_compact
            && counter > self.compaction_threshold
            && counter as usize >= length / 2
    }
}
