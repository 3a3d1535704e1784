//! Word → path index.
//!
//! Two layouts implement the same [`Index`] contract:
//! - `inverted` - word storage plus a reverse map, constant-time lookups
//! - `compact` - reverse map only, lookups scan every indexed file
//!
//! File content is turned into words by a pluggable [`WordExtractor`].

mod compact;
mod extract;
mod inverted;

use std::path::Path;
use std::sync::Arc;

pub use compact::CompactIndex;
pub use extract::{TextWordExtractor, WordExtractor, WORD_DELIMITERS};
pub use inverted::InvertedIndex;

use crate::config::IndexKind;
use crate::error::Result;
use crate::storage::ValueStorage;

pub trait Index: Send + Sync {
    /// Returns a snapshot of the paths containing `word`.
    fn get(&self, word: &str) -> Option<ValueStorage>;

    /// Re-indexes `path`. Words previously contributed by `path` are retracted
    /// first; if `path` is no longer a regular file nothing is added back.
    ///
    /// Extraction failures leave `path` associated with no words.
    fn update(&self, path: &Path) -> Result<()>;

    /// Retracts every word contributed by `path`. Unknown paths are a no-op.
    fn remove(&self, path: &Path);

    fn clear(&self);

    /// Number of files currently contributing words.
    fn indexed_files(&self) -> usize;
}

/// Builds the index layout selected by `kind`.
pub fn build_index(kind: IndexKind, extractor: Arc<dyn WordExtractor>) -> Arc<dyn Index> {
    match kind {
        IndexKind::Inverted => Arc::new(InvertedIndex::new(extractor)),
        IndexKind::Compact => Arc::new(CompactIndex::new(extractor)),
    }
}

/// Index key for a path.
pub(crate) fn path_key(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
