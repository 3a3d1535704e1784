//! Registration tree.
//!
//! Every tracked path lives in one arena keyed by path. Directories own a
//! live OS watch and the names of their tracked children, files are plain
//! leaves. A path is registered at most once. Symlinks are tracked as
//! leaves and never followed.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use fnv::{FnvHashMap, FnvHashSet};
use parking_lot::RwLock;

use super::backend::{WatchBackend, WatchHandle};
use crate::error::{IndexError, Result};

#[derive(Debug)]
pub enum FsEntry {
    Directory {
        handle: WatchHandle,
        children: FnvHashSet<OsString>,
    },
    File,
}

impl FsEntry {
    pub fn is_directory(&self) -> bool {
        matches!(self, Self::Directory { .. })
    }
}

type EntryMap = FnvHashMap<PathBuf, FsEntry>;

pub struct Registrar {
    backend: Arc<dyn WatchBackend>,
    entries: RwLock<EntryMap>,
    closed: AtomicBool,
}

impl std::fmt::Debug for Registrar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registrar")
            .field("entries", &self.entries.read().len())
            .finish()
    }
}

impl Registrar {
    pub fn new(backend: Arc<dyn WatchBackend>) -> Self {
        Self {
            backend,
            entries: RwLock::new(FnvHashMap::default()),
            closed: AtomicBool::new(false),
        }
    }

    /// Tracks `path`, watching it when it is a real directory.
    ///
    /// Returns false if `path` was already tracked. Either way the entry is
    /// linked to its parent when the parent is a tracked directory. Fails
    /// with `Terminated` once the registrar is closed.
    pub fn register(&self, path: &Path) -> Result<bool> {
        let is_dir = fs::symlink_metadata(path)
            .map(|metadata| metadata.is_dir())
            .unwrap_or(false);

        let mut entries = self.entries.write();
        if self.closed.load(Ordering::Acquire) {
            return Err(IndexError::Terminated);
        }
        link_to_parent(&mut entries, path);
        if entries.contains_key(path) {
            return Ok(false);
        }
        let entry = if is_dir {
            FsEntry::Directory {
                handle: WatchHandle::acquire(path, Arc::clone(&self.backend))?,
                children: FnvHashSet::default(),
            }
        } else {
            FsEntry::File
        };
        entries.insert(path.to_path_buf(), entry);
        log::trace!(
            "registered {} {}",
            if is_dir { "directory" } else { "file" },
            path.display()
        );
        Ok(true)
    }

    /// Removes `path` and everything below it, cancelling directory watches.
    ///
    /// Returns every removed path, descendants before their parents. An
    /// untracked `path` yields an empty list.
    pub fn unregister_all(&self, path: &Path) -> Vec<PathBuf> {
        let mut removed = Vec::new();
        let mut entries = self.entries.write();
        if !entries.contains_key(path) {
            return removed;
        }
        unregister_subtree(&mut entries, path, &mut removed);
        if let (Some(parent), Some(name)) = (path.parent(), path.file_name()) {
            if let Some(FsEntry::Directory { children, .. }) = entries.get_mut(parent) {
                children.remove(name);
            }
        }
        removed
    }

    pub fn is_registered(&self, path: &Path) -> bool {
        self.entries.read().contains_key(path)
    }

    pub fn is_directory(&self, path: &Path) -> bool {
        self.entries
            .read()
            .get(path)
            .map(FsEntry::is_directory)
            .unwrap_or(false)
    }

    /// Names of the tracked children of directory `path`, sorted.
    pub fn children(&self, path: &Path) -> Vec<OsString> {
        let entries = self.entries.read();
        let mut names: Vec<OsString> = match entries.get(path) {
            Some(FsEntry::Directory { children, .. }) => children.iter().cloned().collect(),
            _ => Vec::new(),
        };
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Drops every entry and cancels every watch.
    pub fn clear(&self) {
        self.drain(false);
    }

    /// Like [`Registrar::clear`], and refuses all later registrations.
    pub fn close(&self) {
        self.drain(true);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn drain(&self, close: bool) {
        let drained: Vec<FsEntry> = {
            let mut entries = self.entries.write();
            if close {
                self.closed.store(true, Ordering::Release);
            }
            entries.drain().map(|(_, entry)| entry).collect()
        };
        for entry in drained {
            if let FsEntry::Directory { handle, .. } = entry {
                handle.cancel();
            }
        }
    }
}

fn link_to_parent(entries: &mut EntryMap, path: &Path) {
    if let (Some(parent), Some(name)) = (path.parent(), path.file_name()) {
        if let Some(FsEntry::Directory { children, .. }) = entries.get_mut(parent) {
            children.insert(name.to_os_string());
        }
    }
}

fn unregister_subtree(entries: &mut EntryMap, path: &Path, removed: &mut Vec<PathBuf>) {
    let Some(entry) = entries.remove(path) else {
        return;
    };
    if let FsEntry::Directory { handle, children } = entry {
        for name in children {
            unregister_subtree(entries, &path.join(name), removed);
        }
        handle.cancel();
    }
    removed.push(path.to_path_buf());
}
