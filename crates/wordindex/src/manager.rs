//! WordIndexManager - main API for word indexing.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;

use crate::config::IndexConfig;
use crate::error::{canonicalize_existing_path, IndexError, Result};
use crate::filter::PathFilter;
use crate::index::{build_index, Index, TextWordExtractor, WordExtractor};
use crate::indexer::{IndexingListener, PendingPaths, RegisterWalk, TaskSubmitter, WorkerPool};
use crate::lifecycle::{Lifecycle, LifecycleState};
use crate::watcher::{
    ChangeWatcher, EventDispatcher, NotifyBackend, RawEventReceiver, Registrar, WatchBackend,
};

/// Watches directory trees and answers "which files contain this word".
///
/// Every operation fails with [`IndexError::Terminated`] after
/// [`WordIndexManager::shutdown`]. Dropping the manager shuts it down.
pub struct WordIndexManager {
    config: IndexConfig,
    lifecycle: Arc<Lifecycle>,
    shutdown_lock: Mutex<()>,
    index: Arc<dyn Index>,
    registrar: Arc<Registrar>,
    filter: Arc<PathFilter>,
    pending: Arc<PendingPaths>,
    pool: Arc<WorkerPool>,
    submitter: Arc<TaskSubmitter>,
    watcher: ChangeWatcher,
}

impl std::fmt::Debug for WordIndexManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WordIndexManager")
            .field("config", &self.config)
            .field("state", &self.lifecycle.state())
            .field("registered", &self.registrar.len())
            .field("pending", &self.pending.len())
            .finish()
    }
}

impl WordIndexManager {
    /// Creates a manager watching through the platform's native backend.
    pub fn new(config: IndexConfig) -> Result<Self> {
        let (backend, events) = NotifyBackend::new()?;
        let extractor = Arc::new(TextWordExtractor::new(config.max_file_size));
        Self::with_parts(config, Arc::new(backend), events, extractor)
    }

    /// Creates a manager and starts watching `root`.
    pub fn with_root(config: IndexConfig, root: impl AsRef<Path>) -> Result<Self> {
        let manager = Self::new(config)?;
        manager.start_watch(root)?;
        Ok(manager)
    }

    /// Creates a manager from explicit collaborators. `events` must carry the
    /// notifications for directories registered on `backend`.
    pub fn with_parts(
        config: IndexConfig,
        backend: Arc<dyn WatchBackend>,
        events: RawEventReceiver,
        extractor: Arc<dyn WordExtractor>,
    ) -> Result<Self> {
        config.validate()?;
        let filter = Arc::new(PathFilter::from_config(&config)?);
        log::debug!("{filter}");

        let lifecycle = Arc::new(Lifecycle::new());
        let index = build_index(config.index_kind, extractor);
        let registrar = Arc::new(Registrar::new(backend));
        let pending = Arc::new(PendingPaths::new());
        let pool = Arc::new(WorkerPool::new(config.threads)?);
        let submitter = Arc::new(TaskSubmitter::new(
            Arc::clone(&index),
            Arc::clone(&pending),
            Arc::clone(&pool),
            Arc::clone(&lifecycle),
        ));

        let dispatcher = Arc::new(EventDispatcher::new());
        dispatcher.add_listener(Arc::new(IndexingListener::new(
            Arc::clone(&registrar),
            Arc::clone(&filter),
            Arc::clone(&submitter),
            Arc::clone(&lifecycle),
        )));
        let watcher = ChangeWatcher::start(events, dispatcher, Arc::clone(&lifecycle))?;

        log::info!("word index started: {config}");
        Ok(Self {
            config,
            lifecycle,
            shutdown_lock: Mutex::new(()),
            index,
            registrar,
            filter,
            pending,
            pool,
            submitter,
            watcher,
        })
    }

    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    pub fn state(&self) -> LifecycleState {
        self.lifecycle.state()
    }

    /// Registers `dir` recursively and queues every accepted file.
    ///
    /// Watching an already watched directory only logs a warning.
    pub fn start_watch(&self, dir: impl AsRef<Path>) -> Result<()> {
        self.lifecycle.ensure_running()?;
        let dir = canonicalize_existing_path(dir.as_ref().to_path_buf());
        if !dir.is_dir() {
            return Err(IndexError::NotADirectory(dir));
        }
        if self.registrar.is_registered(&dir) {
            log::warn!("{} is already watched", dir.display());
            return Ok(());
        }
        log::info!("start watching {}", dir.display());
        RegisterWalk::new(&self.registrar, &self.filter, &self.submitter).run(&dir)
    }

    /// Stops watching `dir` and everything below it, retracting their words.
    pub fn stop_watch(&self, dir: impl AsRef<Path>) -> Result<()> {
        self.lifecycle.ensure_running()?;
        let dir = canonicalize_existing_path(dir.as_ref().to_path_buf());
        if !self.registrar.is_directory(&dir) {
            return Err(IndexError::NotWatched(dir));
        }
        let removed = self.registrar.unregister_all(&dir);
        log::info!(
            "stop watching {} ({} paths)",
            dir.display(),
            removed.len()
        );
        for path in removed {
            self.submitter.submit_remove(&path)?;
        }
        Ok(())
    }

    pub fn is_watched(&self, path: impl AsRef<Path>) -> Result<bool> {
        self.lifecycle.ensure_running()?;
        let path = canonicalize_existing_path(path.as_ref().to_path_buf());
        Ok(self.registrar.is_registered(&path))
    }

    /// Sorted paths of the files containing `word`. Blocks until indexing is
    /// idle first when `block_requests` is configured.
    pub fn get_paths_by_word(&self, word: &str) -> Result<Vec<String>> {
        self.lifecycle.ensure_running()?;
        log::debug!("lookup `{word}`");
        if self.config.block_requests {
            self.pending.wait_idle(&self.lifecycle)?;
        }
        let paths = self
            .index
            .get(word)
            .map(|values| values.to_sorted_vec())
            .unwrap_or_default();
        self.lifecycle.ensure_running()?;
        Ok(paths)
    }

    /// Blocks until no index task is queued or running.
    pub fn wait_idle(&self) -> Result<()> {
        self.lifecycle.ensure_running()?;
        self.pending.wait_idle(&self.lifecycle)
    }

    pub fn pending_count(&self) -> Result<usize> {
        self.lifecycle.ensure_running()?;
        Ok(self.pending.len())
    }

    pub fn indexed_file_count(&self) -> Result<usize> {
        self.lifecycle.ensure_running()?;
        Ok(self.index.indexed_files())
    }

    pub fn registered_count(&self) -> Result<usize> {
        self.lifecycle.ensure_running()?;
        Ok(self.registrar.len())
    }

    /// Stops watching, abandons queued work and clears all state.
    ///
    /// Tasks already running finish first. Idempotent; later calls only log.
    pub fn shutdown(&self) {
        let _guard = self.shutdown_lock.lock();
        if !self.lifecycle.terminate() {
            log::debug!("word index already terminated");
            return;
        }
        let started = Instant::now();
        self.watcher.stop();
        let discarded = self.pool.shutdown();
        self.pending.clear();
        self.index.clear();
        // Closing also stops a concurrent start_watch walk from re-registering.
        self.registrar.close();
        log::info!(
            "word index stopped in {:?} ({} queued tasks discarded)",
            started.elapsed(),
            discarded
        );
    }

    /// Paths currently registered under `dir`, for diagnostics.
    pub fn watched_children(&self, dir: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
        self.lifecycle.ensure_running()?;
        let dir = canonicalize_existing_path(dir.as_ref().to_path_buf());
        Ok(self
            .registrar
            .children(&dir)
            .into_iter()
            .map(|name| dir.join(name))
            .collect())
    }
}

impl Drop for WordIndexManager {
    fn drop(&mut self) {
        self.shutdown();
    }
}
