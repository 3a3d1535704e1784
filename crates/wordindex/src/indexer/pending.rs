//! Set of paths scheduled for indexing.
//!
//! A path stays in the set from submission until its task starts, which is
//! what debounces bursts of events for the same file. The most recent
//! submission decides what the queued task does. Running tasks are counted
//! separately so callers can wait until the indexer is fully idle.

use std::path::{Path, PathBuf};
use std::time::Duration;

use fnv::FnvHashMap;
use parking_lot::{Condvar, Mutex};

use super::submit::TaskKind;
use crate::error::Result;
use crate::lifecycle::Lifecycle;

/// Upper bound on one condvar wait, so waiters notice termination.
const IDLE_RECHECK: Duration = Duration::from_millis(50);

#[derive(Debug, Default)]
struct PendingState {
    paths: FnvHashMap<PathBuf, TaskKind>,
    running: usize,
}

impl PendingState {
    fn is_idle(&self) -> bool {
        self.paths.is_empty() && self.running == 0
    }
}

#[derive(Debug, Default)]
pub struct PendingPaths {
    state: Mutex<PendingState>,
    idle: Condvar,
}

impl PendingPaths {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `path` with `kind`. Returns false if a task for it is already
    /// queued; that task will then run as `kind`.
    pub fn try_insert(&self, path: &Path, kind: TaskKind) -> bool {
        self.state
            .lock()
            .paths
            .insert(path.to_path_buf(), kind)
            .is_none()
    }

    /// Takes `path` back out without running it, e.g. when submission failed.
    pub fn remove(&self, path: &Path) -> bool {
        let mut state = self.state.lock();
        let removed = state.paths.remove(path).is_some();
        if state.is_idle() {
            self.idle.notify_all();
        }
        removed
    }

    /// Marks the task for `path` as started and returns what it must do.
    /// `None` means `path` is no longer pending and the task must not run.
    pub fn begin(&self, path: &Path) -> Option<TaskKind> {
        let mut state = self.state.lock();
        let kind = state.paths.remove(path)?;
        state.running += 1;
        Some(kind)
    }

    /// Marks a task started with [`PendingPaths::begin`] as done.
    pub fn finish(&self) {
        let mut state = self.state.lock();
        state.running = state.running.saturating_sub(1);
        if state.is_idle() {
            self.idle.notify_all();
        }
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.state.lock().paths.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.state.lock().paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().paths.is_empty()
    }

    pub fn running(&self) -> usize {
        self.state.lock().running
    }

    pub fn is_idle(&self) -> bool {
        self.state.lock().is_idle()
    }

    /// Forgets every queued path and wakes all waiters.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.paths.clear();
        self.idle.notify_all();
    }

    /// Blocks until nothing is queued or running.
    ///
    /// Fails with `Terminated` if `lifecycle` is terminated first.
    pub fn wait_idle(&self, lifecycle: &Lifecycle) -> Result<()> {
        let mut state = self.state.lock();
        loop {
            lifecycle.ensure_running()?;
            if state.is_idle() {
                return Ok(());
            }
            self.idle.wait_for(&mut state, IDLE_RECHECK);
        }
    }
}
