use std::path::Path;
use std::sync::Arc;

use fnv::{FnvHashMap, FnvHashSet};
use parking_lot::RwLock;

use super::extract::WordExtractor;
use super::{path_key, Index};
use crate::error::Result;
use crate::storage::ValueStorage;

/// Memory-lean index that keeps only the reverse map.
///
/// Lookups scan every indexed file, trading query latency for not storing
/// each path once per word.
pub struct CompactIndex {
    extractor: Arc<dyn WordExtractor>,
    file_words: RwLock<FnvHashMap<String, FnvHashSet<String>>>,
}

impl std::fmt::Debug for CompactIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompactIndex")
            .field("files", &self.file_words.read().len())
            .finish()
    }
}

impl CompactIndex {
    pub fn new(extractor: Arc<dyn WordExtractor>) -> Self {
        Self {
            extractor,
            file_words: RwLock::new(FnvHashMap::default()),
        }
    }
}

impl Index for CompactIndex {
    fn get(&self, word: &str) -> Option<ValueStorage> {
        let file_words = self.file_words.read();
        let values: ValueStorage = file_words
            .iter()
            .filter(|(_, words)| words.contains(word))
            .map(|(path, _)| path.clone())
            .collect();
        (!values.is_empty()).then_some(values)
    }

    fn update(&self, path: &Path) -> Result<()> {
        let key = path_key(path);
        let extracted = path.is_file().then(|| self.extractor.extract(path));

        let mut file_words = self.file_words.write();
        file_words.remove(&key);

        let Some(extracted) = extracted else {
            return Ok(());
        };
        let words = extracted?;
        if !words.is_empty() {
            file_words.insert(key, words);
        }
        Ok(())
    }

    fn remove(&self, path: &Path) {
        self.file_words.write().remove(&path_key(path));
    }

    fn clear(&self) {
        self.file_words.write().clear();
    }

    fn indexed_files(&self) -> usize {
        self.file_words.read().len()
    }
}
