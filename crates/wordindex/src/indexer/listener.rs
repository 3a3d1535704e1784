//! Turns watcher callbacks into registration changes and index tasks.

use std::path::Path;
use std::sync::Arc;

use super::submit::TaskSubmitter;
use super::walk::RegisterWalk;
use crate::error::Result;
use crate::filter::PathFilter;
use crate::lifecycle::Lifecycle;
use crate::watcher::{EventListener, Registrar};

pub struct IndexingListener {
    registrar: Arc<Registrar>,
    filter: Arc<PathFilter>,
    submitter: Arc<TaskSubmitter>,
    lifecycle: Arc<Lifecycle>,
}

impl IndexingListener {
    pub fn new(
        registrar: Arc<Registrar>,
        filter: Arc<PathFilter>,
        submitter: Arc<TaskSubmitter>,
        lifecycle: Arc<Lifecycle>,
    ) -> Self {
        Self {
            registrar,
            filter,
            submitter,
            lifecycle,
        }
    }

    fn register_and_update(&self, path: &Path) -> Result<()> {
        self.lifecycle.ensure_running()?;
        if !self.filter.accept(path) {
            // A tracked file can start failing the filter, e.g. once it turns binary.
            let removed = self.registrar.unregister_all(path);
            if removed.is_empty() {
                log::trace!("ignoring {}", path.display());
            } else {
                log::debug!("{} no longer accepted, retracting", path.display());
            }
            for removed in removed {
                self.submitter.submit_remove(&removed)?;
            }
            return Ok(());
        }
        self.registrar.register(path)?;
        self.submitter.submit_update(path)?;
        Ok(())
    }
}

impl EventListener for IndexingListener {
    fn on_file_created(&self, path: &Path) -> Result<()> {
        self.register_and_update(path)
    }

    fn on_file_modified(&self, path: &Path) -> Result<()> {
        self.register_and_update(path)
    }

    fn on_directory_created(&self, path: &Path) -> Result<()> {
        self.lifecycle.ensure_running()?;
        RegisterWalk::new(&self.registrar, &self.filter, &self.submitter).run(path)
    }

    fn on_directory_modified(&self, path: &Path) -> Result<()> {
        // Entry changes arrive as their own events.
        log::trace!("directory modified: {}", path.display());
        Ok(())
    }

    fn on_deleted(&self, path: &Path) -> Result<()> {
        self.lifecycle.ensure_running()?;
        // Updating a path that no longer exists retracts its words.
        for removed in self.registrar.unregister_all(path) {
            self.submitter.submit_update(&removed)?;
        }
        Ok(())
    }

    fn on_overflow(&self, root: &Path) -> Result<()> {
        log::warn!(
            "filesystem events were lost under {}; index may be stale",
            root.display()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{Index, InvertedIndex, TextWordExtractor};
    use crate::indexer::{PendingPaths, WorkerPool};
    use crate::watcher::testing::RecordingBackend;
    use std::fs;
    use tempfile::TempDir;

    struct Fixture {
        temp: TempDir,
        registrar: Arc<Registrar>,
        index: Arc<dyn Index>,
        pending: Arc<PendingPaths>,
        lifecycle: Arc<Lifecycle>,
        listener: IndexingListener,
    }

    impl Fixture {
        fn settle(&self) {
            self.pending.wait_idle(&self.lifecycle).unwrap();
        }
    }

    fn fixture(filter: PathFilter) -> Fixture {
        let temp = TempDir::new().unwrap();
        let registrar = Arc::new(Registrar::new(Arc::new(RecordingBackend::default())));
        registrar.register(temp.path()).unwrap();
        let index: Arc<dyn Index> =
            Arc::new(InvertedIndex::new(Arc::new(TextWordExtractor::new(1024))));
        let pending = Arc::new(PendingPaths::new());
        let lifecycle = Arc::new(Lifecycle::new());
        let submitter = Arc::new(TaskSubmitter::new(
            index.clone(),
            pending.clone(),
            Arc::new(WorkerPool::new(2).unwrap()),
            lifecycle.clone(),
        ));
        let listener = IndexingListener::new(
            registrar.clone(),
            Arc::new(filter),
            submitter,
            lifecycle.clone(),
        );
        Fixture {
            temp,
            registrar,
            index,
            pending,
            lifecycle,
            listener,
        }
    }

    #[test]
    fn created_file_is_registered_and_indexed() {
        let fx = fixture(PathFilter::new());
        let file = fx.temp.path().join("new.txt");
        fs::write(&file, "fresh words").unwrap();

        fx.listener.on_file_created(&file).unwrap();
        fx.settle();
        assert!(fx.registrar.is_registered(&file));
        assert!(fx.index.get("fresh").is_some());
    }

    #[test]
    fn modified_file_is_reindexed() {
        let fx = fixture(PathFilter::new());
        let file = fx.temp.path().join("doc.txt");
        fs::write(&file, "before").unwrap();
        fx.listener.on_file_created(&file).unwrap();
        fx.settle();

        fs::write(&file, "after").unwrap();
        fx.listener.on_file_modified(&file).unwrap();
        fx.settle();
        assert!(fx.index.get("before").is_none());
        assert!(fx.index.get("after").is_some());
    }

    #[test]
    fn filtered_file_is_ignored() {
        let fx = fixture(PathFilter::from_patterns("\\.log$").unwrap());
        let file = fx.temp.path().join("server.log");
        fs::write(&file, "noise").unwrap();

        fx.listener.on_file_created(&file).unwrap();
        fx.settle();
        assert!(!fx.registrar.is_registered(&file));
        assert!(fx.index.get("noise").is_none());
    }

    #[test]
    fn file_turned_binary_is_retracted() {
        let fx = fixture(PathFilter::new());
        let file = fx.temp.path().join("doc.dat");
        fs::write(&file, "stale text").unwrap();
        fx.listener.on_file_created(&file).unwrap();
        fx.settle();
        assert!(fx.index.get("stale").is_some());

        fs::write(&file, b"fresh\x00binary").unwrap();
        fx.listener.on_file_modified(&file).unwrap();
        fx.settle();
        assert!(fx.index.get("stale").is_none());
        assert!(fx.index.get("fresh").is_none());
        assert!(!fx.registrar.is_registered(&file));
        assert_eq!(fx.registrar.children(fx.temp.path()), Vec::<std::ffi::OsString>::new());
    }

    #[test]
    fn created_directory_is_walked() {
        let fx = fixture(PathFilter::new());
        let dir = fx.temp.path().join("nested");
        fs::create_dir_all(dir.join("inner")).unwrap();
        fs::write(dir.join("inner/deep.txt"), "deep").unwrap();

        fx.listener.on_directory_created(&dir).unwrap();
        fx.settle();
        assert!(fx.registrar.is_directory(&dir.join("inner")));
        assert!(fx.index.get("deep").is_some());
    }

    #[test]
    fn deleted_directory_retracts_every_file() {
        let fx = fixture(PathFilter::new());
        let dir = fx.temp.path().join("gone");
        fs::create_dir(&dir).unwrap();
        fs::write(dir.join("one.txt"), "vanishing").unwrap();
        fs::write(dir.join("two.txt"), "vanishing").unwrap();
        fx.listener.on_directory_created(&dir).unwrap();
        fx.settle();
        assert_eq!(fx.index.get("vanishing").map(|v| v.len()), Some(2));

        fs::remove_dir_all(&dir).unwrap();
        fx.listener.on_deleted(&dir).unwrap();
        fx.settle();
        assert!(fx.index.get("vanishing").is_none());
        assert!(!fx.registrar.is_registered(&dir));
    }

    #[test]
    fn callbacks_fail_after_termination() {
        let fx = fixture(PathFilter::new());
        fx.lifecycle.terminate();
        let error = fx
            .listener
            .on_file_created(&fx.temp.path().join("late.txt"))
            .expect_err("terminated");
        assert!(error.is_terminated());
    }
}
