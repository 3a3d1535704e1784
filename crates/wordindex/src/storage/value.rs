use fnv::FnvHashSet;

/// Set of paths associated with one word.
///
/// Callers outside the storage only ever see copies, so a returned
/// `ValueStorage` is a point-in-time snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValueStorage {
    paths: FnvHashSet<String>,
}

impl ValueStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a path. Returns false if it was already present.
    pub fn add(&mut self, path: impl Into<String>) -> bool {
        self.paths.insert(path.into())
    }

    /// Removes a path. Returns false if it was not present.
    pub fn remove(&mut self, path: &str) -> bool {
        self.paths.remove(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.paths.contains(path)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.paths.iter().map(String::as_str)
    }

    /// Returns the paths sorted, for deterministic output.
    pub fn to_sorted_vec(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.paths.iter().cloned().collect();
        paths.sort_unstable();
        paths
    }
}

impl FromIterator<String> for ValueStorage {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self {
            paths: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_ignores_duplicates() {
        let mut values = ValueStorage::new();
        assert!(values.add("/a"));
        assert!(!values.add("/a"));
        assert_eq!(values.len(), 1);
    }

    #[test]
    fn remove_reports_presence() {
        let mut values = ValueStorage::new();
        values.add("/a");
        assert!(values.remove("/a"));
        assert!(!values.remove("/a"));
        assert!(values.is_empty());
    }

    #[test]
    fn clone_is_independent_snapshot() {
        let mut values = ValueStorage::new();
        values.add("/a");
        let snapshot = values.clone();
        values.add("/b");
        values.remove("/a");

        assert!(snapshot.contains("/a"));
        assert!(!snapshot.contains("/b"));
        assert_eq!(snapshot.len(), 1);
    }

    #[test]
    fn sorted_vec_is_ordered() {
        let values: ValueStorage = ["/c", "/a", "/b"].into_iter().map(String::from).collect();
        assert_eq!(values.to_sorted_vec(), vec!["/a", "/b", "/c"]);
    }
}
