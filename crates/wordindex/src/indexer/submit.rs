//! Index task submission.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::pending::PendingPaths;
use super::pool::WorkerPool;
use crate::error::Result;
use crate::index::Index;
use crate::lifecycle::Lifecycle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    /// Re-read the file and replace its words.
    Update,
    /// Retract the file's words.
    Remove,
}

impl TaskKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Update => "update",
            Self::Remove => "remove",
        }
    }
}

/// Schedules per-path index work on the pool, at most one queued task per
/// path.
pub struct TaskSubmitter {
    index: Arc<dyn Index>,
    pending: Arc<PendingPaths>,
    pool: Arc<WorkerPool>,
    lifecycle: Arc<Lifecycle>,
}

impl std::fmt::Debug for TaskSubmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskSubmitter")
            .field("pending", &self.pending.len())
            .field("pool", &self.pool)
            .finish()
    }
}

impl TaskSubmitter {
    pub fn new(
        index: Arc<dyn Index>,
        pending: Arc<PendingPaths>,
        pool: Arc<WorkerPool>,
        lifecycle: Arc<Lifecycle>,
    ) -> Self {
        Self {
            index,
            pending,
            pool,
            lifecycle,
        }
    }

    /// Returns true if a task was queued, false if one was already pending.
    /// A pending task for the same path is switched to the latest kind.
    pub fn submit_update(&self, path: &Path) -> Result<bool> {
        self.submit(path, TaskKind::Update)
    }

    /// Returns true if a task was queued, false if one was already pending.
    pub fn submit_remove(&self, path: &Path) -> Result<bool> {
        self.submit(path, TaskKind::Remove)
    }

    fn submit(&self, path: &Path, kind: TaskKind) -> Result<bool> {
        self.lifecycle.ensure_running()?;
        if !self.pending.try_insert(path, kind) {
            log::trace!("{} already pending, now as {}", path.display(), kind.as_str());
            return Ok(false);
        }

        let task = IndexTask {
            path: path.to_path_buf(),
            index: Arc::clone(&self.index),
            pending: Arc::clone(&self.pending),
            lifecycle: Arc::clone(&self.lifecycle),
        };
        if let Err(error) = self.pool.execute(Box::new(move || task.run())) {
            self.pending.remove(path);
            log::error!("failed to submit {} for {}: {}", kind.as_str(), path.display(), error);
            return Err(error);
        }
        log::debug!("submitted {} for {}", kind.as_str(), path.display());
        Ok(true)
    }
}

struct IndexTask {
    path: PathBuf,
    index: Arc<dyn Index>,
    pending: Arc<PendingPaths>,
    lifecycle: Arc<Lifecycle>,
}

/// Releases the running slot even if the task unwinds.
struct RunningGuard<'a>(&'a PendingPaths);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.finish();
    }
}

impl IndexTask {
    fn run(self) {
        let Some(kind) = self.pending.begin(&self.path) else {
            log::warn!("{} is no longer pending", self.path.display());
            return;
        };
        let _running = RunningGuard(&self.pending);
        if !self.lifecycle.is_running() {
            return;
        }

        match kind {
            TaskKind::Update => match self.index.update(&self.path) {
                Ok(()) => log::debug!("updated {}", self.path.display()),
                Err(error) if error.is_recoverable() => {
                    log::warn!("skipped {}: {}", self.path.display(), error)
                }
                Err(error) => log::error!("failed to update {}: {}", self.path.display(), error),
            },
            TaskKind::Remove => {
                self.index.remove(&self.path);
                log::debug!("removed {}", self.path.display());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{InvertedIndex, TextWordExtractor, WordExtractor};
    use fnv::FnvHashSet;
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Barrier;
    use tempfile::TempDir;

    #[derive(Default)]
    struct CountingExtractor {
        calls: AtomicUsize,
    }

    impl WordExtractor for CountingExtractor {
        fn extract(&self, _path: &Path) -> Result<FnvHashSet<String>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(FnvHashSet::from_iter(["counted".to_string()]))
        }
    }

    struct Fixture {
        index: Arc<dyn Index>,
        pending: Arc<PendingPaths>,
        pool: Arc<WorkerPool>,
        lifecycle: Arc<Lifecycle>,
        submitter: TaskSubmitter,
    }

    fn fixture() -> Fixture {
        let index: Arc<dyn Index> =
            Arc::new(InvertedIndex::new(Arc::new(TextWordExtractor::new(1024))));
        let pending = Arc::new(PendingPaths::new());
        let pool = Arc::new(WorkerPool::new(2).unwrap());
        let lifecycle = Arc::new(Lifecycle::new());
        let submitter = TaskSubmitter::new(
            index.clone(),
            pending.clone(),
            pool.clone(),
            lifecycle.clone(),
        );
        Fixture {
            index,
            pending,
            pool,
            lifecycle,
            submitter,
        }
    }

    #[test]
    fn update_then_remove_round_trip() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("file.txt");
        fs::write(&file, "alpha beta").unwrap();

        let fx = fixture();
        assert!(fx.submitter.submit_update(&file).unwrap());
        fx.pending.wait_idle(&fx.lifecycle).unwrap();
        assert!(fx.index.get("alpha").is_some());

        assert!(fx.submitter.submit_remove(&file).unwrap());
        fx.pending.wait_idle(&fx.lifecycle).unwrap();
        assert!(fx.index.get("alpha").is_none());
    }

    #[test]
    fn recoverable_failure_leaves_file_unindexed() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("empty.txt");
        fs::write(&file, "").unwrap();

        let fx = fixture();
        fx.submitter.submit_update(&file).unwrap();
        fx.pending.wait_idle(&fx.lifecycle).unwrap();
        assert_eq!(fx.index.indexed_files(), 0);
    }

    #[test]
    fn duplicate_submission_is_debounced() {
        let fx = fixture();
        let path = Path::new("/nonexistent/file.txt");
        // Keep the path pending by occupying it before any worker can start it.
        assert!(fx.pending.try_insert(path, TaskKind::Update));
        assert!(!fx.submitter.submit_update(path).unwrap());
        assert!(!fx.submitter.submit_remove(path).unwrap());
        assert!(fx.pending.remove(path));
    }

    #[test]
    fn submission_after_termination_fails() {
        let fx = fixture();
        fx.lifecycle.terminate();
        let error = fx
            .submitter
            .submit_update(Path::new("/nonexistent"))
            .expect_err("terminated");
        assert!(error.is_terminated());
        assert!(fx.pending.is_empty());
    }

    #[test]
    fn pool_failure_releases_pending_path() {
        let fx = fixture();
        fx.pool.shutdown();
        let path = Path::new("/nonexistent");
        let error = fx.submitter.submit_update(path).expect_err("pool closed");
        assert!(error.is_terminated());
        assert!(!fx.pending.contains(path));
    }

    #[test]
    fn submissions_before_start_run_once() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("burst.txt");
        fs::write(&file, "ignored").unwrap();

        let extractor = Arc::new(CountingExtractor::default());
        let index: Arc<dyn Index> = Arc::new(InvertedIndex::new(extractor.clone()));
        let pending = Arc::new(PendingPaths::new());
        let pool = Arc::new(WorkerPool::new(1).unwrap());
        let lifecycle = Arc::new(Lifecycle::new());
        let submitter =
            TaskSubmitter::new(index.clone(), pending.clone(), pool.clone(), lifecycle.clone());

        // Occupy the only worker so both submissions queue behind it.
        let gate = Arc::new(Barrier::new(2));
        let blocker = gate.clone();
        pool.execute(Box::new(move || {
            blocker.wait();
        }))
        .unwrap();

        assert!(submitter.submit_update(&file).unwrap());
        assert!(!submitter.submit_update(&file).unwrap());
        assert_eq!(pending.len(), 1);

        gate.wait();
        pending.wait_idle(&lifecycle).unwrap();
        assert_eq!(extractor.calls.load(Ordering::SeqCst), 1);
        assert!(index.get("counted").is_some());
    }

    #[test]
    fn remove_submitted_over_queued_update_wins() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("gone.txt");
        fs::write(&file, "lingering").unwrap();

        let fx = fixture();
        fx.submitter.submit_update(&file).unwrap();
        fx.pending.wait_idle(&fx.lifecycle).unwrap();
        assert!(fx.index.get("lingering").is_some());

        let gate = Arc::new(Barrier::new(3));
        for _ in 0..2 {
            let blocker = gate.clone();
            fx.pool
                .execute(Box::new(move || {
                    blocker.wait();
                }))
                .unwrap();
        }
        assert!(fx.submitter.submit_update(&file).unwrap());
        assert!(!fx.submitter.submit_remove(&file).unwrap());

        gate.wait();
        fx.pending.wait_idle(&fx.lifecycle).unwrap();
        assert!(fx.index.get("lingering").is_none());
    }
}
