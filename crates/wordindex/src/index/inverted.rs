use std::path::Path;
use std::sync::Arc;

use fnv::{FnvHashMap, FnvHashSet};
use parking_lot::RwLock;

use super::extract::WordExtractor;
use super::{path_key, Index};
use crate::error::Result;
use crate::storage::{IndexStorage, ValueStorage};

/// Inverted index backed by [`IndexStorage`] plus a reverse map of the words
/// each file last contributed.
///
/// The reverse-map lock is the index lock: `get` takes it shared, `update` and
/// `remove` take it exclusively around the retract-then-merge sequence, so a
/// reader never sees a file half re-indexed. File content is read before the
/// lock is acquired.
pub struct InvertedIndex {
    extractor: Arc<dyn WordExtractor>,
    storage: IndexStorage,
    file_words: RwLock<FnvHashMap<String, FnvHashSet<String>>>,
}

impl std::fmt::Debug for InvertedIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InvertedIndex")
            .field("words", &self.storage.len())
            .field("files", &self.file_words.read().len())
            .finish()
    }
}

impl InvertedIndex {
    pub fn new(extractor: Arc<dyn WordExtractor>) -> Self {
        Self {
            extractor,
            storage: IndexStorage::new(),
            file_words: RwLock::new(FnvHashMap::default()),
        }
    }

    /// Number of distinct words in storage.
    pub fn word_count(&self) -> usize {
        let _guard = self.file_words.read();
        self.storage.len()
    }

    fn retract(
        &self,
        file_words: &mut FnvHashMap<String, FnvHashSet<String>>,
        key: &str,
    ) {
        if let Some(old_words) = file_words.remove(key) {
            log::debug!("retract words={} path={}", old_words.len(), key);
            self.storage.remove_all(&old_words, key);
        }
    }
}

impl Index for InvertedIndex {
    fn get(&self, word: &str) -> Option<ValueStorage> {
        let _guard = self.file_words.read();
        self.storage.get(word)
    }

    fn update(&self, path: &Path) -> Result<()> {
        let key = path_key(path);
        let extracted = path.is_file().then(|| self.extractor.extract(path));

        let mut file_words = self.file_words.write();
        self.retract(&mut file_words, &key);

        let Some(extracted) = extracted else {
            return Ok(());
        };
        let words = extracted?;
        if !words.is_empty() {
            self.storage.add_all(&words, &key);
            file_words.insert(key, words);
        }
        Ok(())
    }

    fn remove(&self, path: &Path) {
        let key = path_key(path);
        let mut file_words = self.file_words.write();
        self.retract(&mut file_words, &key);
    }

    fn clear(&self) {
        let mut file_words = self.file_words.write();
        file_words.clear();
        self.storage.clear();
    }

    fn indexed_files(&self) -> usize {
        self.file_words.read().len()
    }
}
