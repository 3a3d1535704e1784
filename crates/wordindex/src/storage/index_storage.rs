use fnv::FnvHashMap;
use parking_lot::RwLock;

use super::value::ValueStorage;

/// Thread-safe word → paths mapping.
///
/// Readers share the lock, writers are exclusive. A word whose path set
/// becomes empty is dropped from the map.
#[derive(Debug, Default)]
pub struct IndexStorage {
    map: RwLock<FnvHashMap<String, ValueStorage>>,
}

impl IndexStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, word: &str, path: &str) {
        let mut map = self.map.write();
        match map.get_mut(word) {
            Some(values) => {
                values.add(path);
            }
            None => {
                let mut values = ValueStorage::new();
                values.add(path);
                map.insert(word.to_string(), values);
            }
        }
    }

    /// Removes `path` from `word`. Missing words and paths are a no-op.
    pub fn remove(&self, word: &str, path: &str) {
        let mut map = self.map.write();
        if let Some(values) = map.get_mut(word) {
            values.remove(path);
            if values.is_empty() {
                map.remove(word);
            }
        }
    }

    /// Removes `path` from every word in `words` under a single write lock.
    pub fn remove_all<'a>(&self, words: impl IntoIterator<Item = &'a String>, path: &str) {
        let mut map = self.map.write();
        for word in words {
            if let Some(values) = map.get_mut(word.as_str()) {
                values.remove(path);
                if values.is_empty() {
                    map.remove(word.as_str());
                }
            }
        }
    }

    /// Adds `path` to every word in `words` under a single write lock.
    pub fn add_all<'a>(&self, words: impl IntoIterator<Item = &'a String>, path: &str) {
        let mut map = self.map.write();
        for word in words {
            map.entry(word.clone()).or_default().add(path);
        }
    }

    pub fn contains(&self, word: &str) -> bool {
        self.map.read().contains_key(word)
    }

    /// Returns a copy of the paths stored for `word`.
    pub fn get(&self, word: &str) -> Option<ValueStorage> {
        self.map.read().get(word).cloned()
    }

    /// Number of distinct words.
    pub fn len(&self) -> usize {
        self.map.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.read().is_empty()
    }

    pub fn clear(&self) {
        self.map.write().clear();
    }
}
