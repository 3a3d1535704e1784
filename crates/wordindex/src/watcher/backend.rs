//! OS watch registration.
//!
//! Raw notify callbacks are forwarded through a crossbeam channel; the change
//! watcher thread is the sole consumer.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crossbeam_channel::{unbounded, Receiver};
use notify::{recommended_watcher, Event, RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::Mutex;

use crate::error::{IndexError, Result};

/// Channel end carrying raw notify results to the change watcher.
pub type RawEventReceiver = Receiver<notify::Result<Event>>;

/// Registers single directories (non-recursively) with the OS.
pub trait WatchBackend: Send + Sync {
    fn watch(&self, dir: &Path) -> Result<()>;
    fn unwatch(&self, dir: &Path) -> Result<()>;
}

/// Live watch on one directory. Cancelled explicitly through [`WatchHandle::cancel`].
pub struct WatchHandle {
    dir: PathBuf,
    backend: Arc<dyn WatchBackend>,
}

impl std::fmt::Debug for WatchHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchHandle").field("dir", &self.dir).finish()
    }
}

impl WatchHandle {
    /// Starts watching `dir` on `backend`.
    pub fn acquire(dir: &Path, backend: Arc<dyn WatchBackend>) -> Result<Self> {
        backend.watch(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
            backend,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn cancel(self) {
        // The OS drops the watch by itself when the directory is deleted.
        if let Err(error) = self.backend.unwatch(&self.dir) {
            log::debug!("unwatch {} failed: {}", self.dir.display(), error);
        }
    }
}

/// [`WatchBackend`] on top of notify's recommended watcher.
pub struct NotifyBackend {
    watcher: Mutex<RecommendedWatcher>,
}

impl std::fmt::Debug for NotifyBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotifyBackend").finish_non_exhaustive()
    }
}

impl NotifyBackend {
    /// Creates the backend and the receiver its events are delivered to.
    pub fn new() -> Result<(Self, RawEventReceiver)> {
        let (event_tx, event_rx) = unbounded();
        let watcher = recommended_watcher(move |event_result: notify::Result<Event>| {
            let _ = event_tx.send(event_result);
        })
        .map_err(|error| {
            IndexError::Watch(format!("failed to create filesystem watcher: {error}"))
        })?;
        Ok((
            Self {
                watcher: Mutex::new(watcher),
            },
            event_rx,
        ))
    }
}

impl WatchBackend for NotifyBackend {
    fn watch(&self, dir: &Path) -> Result<()> {
        self.watcher
            .lock()
            .watch(dir, RecursiveMode::NonRecursive)
            .map_err(|error| IndexError::Watch(format!("failed to watch {}: {error}", dir.display())))
    }

    fn unwatch(&self, dir: &Path) -> Result<()> {
        self.watcher.lock().unwatch(dir).map_err(|error| {
            IndexError::Watch(format!("failed to unwatch {}: {error}", dir.display()))
        })
    }
}
