//! Normalized filesystem events.

use std::path::{Path, PathBuf};

use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsEventKind {
    Created,
    Modified,
    Deleted,
    /// Events were lost; the affected root may be out of date.
    Overflow,
}

impl FsEventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Modified => "modified",
            Self::Deleted => "deleted",
            Self::Overflow => "overflow",
        }
    }
}

/// A change relative to the watched directory it was reported on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FsEvent {
    pub kind: FsEventKind,
    /// Watched directory the event was reported on.
    pub root: PathBuf,
    /// Entry name relative to `root`. Empty for overflow events.
    pub path: PathBuf,
}

impl FsEvent {
    pub fn new(kind: FsEventKind, full_path: &Path) -> Self {
        let (root, path) = match (full_path.parent(), full_path.file_name()) {
            (Some(parent), Some(name)) => (parent.to_path_buf(), PathBuf::from(name)),
            _ => (full_path.to_path_buf(), PathBuf::new()),
        };
        Self { kind, root, path }
    }

    pub fn overflow(root: PathBuf) -> Self {
        Self {
            kind: FsEventKind::Overflow,
            root,
            path: PathBuf::new(),
        }
    }

    pub fn full_path(&self) -> PathBuf {
        if self.path.as_os_str().is_empty() {
            self.root.clone()
        } else {
            self.root.join(&self.path)
        }
    }
}

impl std::fmt::Display for FsEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind.as_str(), self.full_path().display())
    }
}

/// Converts a raw notify event into zero or more normalized events.
///
/// Renames become a delete of the old name and a create of the new one.
pub fn normalize_event(event: Event) -> Vec<FsEvent> {
    if event.need_rescan() || event.paths.is_empty() {
        let root = event.paths.into_iter().next().unwrap_or_default();
        return vec![FsEvent::overflow(root)];
    }

    match event.kind {
        EventKind::Access(_) => Vec::new(),
        EventKind::Create(_) => map_paths(FsEventKind::Created, &event.paths),
        EventKind::Remove(_) => map_paths(FsEventKind::Deleted, &event.paths),
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => {
            map_paths(FsEventKind::Deleted, &event.paths)
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => {
            map_paths(FsEventKind::Created, &event.paths)
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            let mut events = Vec::with_capacity(2);
            if let Some(from) = event.paths.first() {
                events.push(FsEvent::new(FsEventKind::Deleted, from));
            }
            if let Some(to) = event.paths.get(1) {
                events.push(FsEvent::new(FsEventKind::Created, to));
            }
            events
        }
        EventKind::Modify(ModifyKind::Name(_)) => event
            .paths
            .iter()
            .map(|path| {
                let kind = if path.exists() {
                    FsEventKind::Created
                } else {
                    FsEventKind::Deleted
                };
                FsEvent::new(kind, path)
            })
            .collect(),
        EventKind::Modify(_) => map_paths(FsEventKind::Modified, &event.paths),
        EventKind::Any | EventKind::Other => {
            let root = event.paths.into_iter().next().unwrap_or_default();
            vec![FsEvent::overflow(root)]
        }
    }
}

fn map_paths(kind: FsEventKind, paths: &[PathBuf]) -> Vec<FsEvent> {
    paths.iter().map(|path| FsEvent::new(kind, path)).collect()
}
