//! Recursive registration of a directory tree.
//!
//! Directories are registered (and watched) before their entries are
//! visited, so every child links to its parent. Sibling entries are visited
//! in parallel with rayon. Accepted files are registered and queued for
//! indexing; rejected directories are skipped with their whole subtree.
//! Symlinks are treated as files and never descended into.

use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use rayon::prelude::*;

use super::submit::TaskSubmitter;
use crate::error::Result;
use crate::filter::PathFilter;
use crate::watcher::Registrar;

/// State shared by one registration walk.
#[derive(Debug)]
pub struct RegisterWalk<'a> {
    pub num_files: AtomicUsize,
    pub num_dirs: AtomicUsize,
    registrar: &'a Registrar,
    filter: &'a PathFilter,
    submitter: &'a TaskSubmitter,
}

impl<'a> RegisterWalk<'a> {
    pub fn new(
        registrar: &'a Registrar,
        filter: &'a PathFilter,
        submitter: &'a TaskSubmitter,
    ) -> Self {
        Self {
            num_files: AtomicUsize::new(0),
            num_dirs: AtomicUsize::new(0),
            registrar,
            filter,
            submitter,
        }
    }

    /// Registers `dir` and everything accepted below it.
    ///
    /// Per-entry failures are logged and skipped. Only `Terminated` aborts the
    /// walk.
    pub fn run(&self, dir: &Path) -> Result<()> {
        let started = std::time::Instant::now();
        self.walk_dir(dir)?;
        log::info!(
            "registered {}: {} directories, {} files in {:?}",
            dir.display(),
            self.num_dirs.load(Ordering::Relaxed),
            self.num_files.load(Ordering::Relaxed),
            started.elapsed()
        );
        Ok(())
    }

    fn walk_dir(&self, dir: &Path) -> Result<()> {
        if fs::symlink_metadata(dir).is_ok_and(|metadata| metadata.file_type().is_symlink()) {
            return self.visit_file(dir);
        }
        if !self.filter.accept(dir) {
            log::trace!("skipping directory {}", dir.display());
            return Ok(());
        }
        match self.registrar.register(dir) {
            Ok(_) => {}
            Err(error) if error.is_terminated() => return Err(error),
            Err(error) => {
                log::warn!("unable to watch {}: {}", dir.display(), error);
                return Ok(());
            }
        }
        self.num_dirs.fetch_add(1, Ordering::Relaxed);

        let entries: Vec<_> = match fs::read_dir(dir) {
            Ok(read_dir) => read_dir.filter_map(|entry| entry.ok()).collect(),
            Err(error) => {
                log::warn!("unable to list {}: {}", dir.display(), error);
                return Ok(());
            }
        };

        entries.into_par_iter().try_for_each(|entry| {
            let path = entry.path();
            let Ok(file_type) = entry.file_type() else {
                return Ok(());
            };
            if file_type.is_dir() {
                self.walk_dir(&path)
            } else {
                self.visit_file(&path)
            }
        })
    }

    fn visit_file(&self, path: &Path) -> Result<()> {
        if !self.filter.accept(path) {
            log::trace!("skipping file {}", path.display());
            return Ok(());
        }
        match self.registrar.register(path) {
            Ok(_) => {}
            Err(error) if error.is_terminated() => return Err(error),
            Err(error) => {
                log::warn!("unable to register {}: {}", path.display(), error);
                return Ok(());
            }
        }
        self.num_files.fetch_add(1, Ordering::Relaxed);
        self.submitter.submit_update(path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{Index, InvertedIndex, TextWordExtractor};
    use crate::indexer::{PendingPaths, WorkerPool};
    use crate::lifecycle::Lifecycle;
    use crate::watcher::testing::RecordingBackend;
    use std::sync::Arc;
    use tempfile::TempDir;

    struct Fixture {
        temp: TempDir,
        backend: Arc<RecordingBackend>,
        registrar: Registrar,
        index: Arc<dyn Index>,
        pending: Arc<PendingPaths>,
        lifecycle: Arc<Lifecycle>,
        submitter: TaskSubmitter,
    }

    fn fixture() -> Fixture {
        let temp = TempDir::new().unwrap();
        let backend = Arc::new(RecordingBackend::default());
        let registrar = Registrar::new(backend.clone());
        let index: Arc<dyn Index> =
            Arc::new(InvertedIndex::new(Arc::new(TextWordExtractor::new(1024))));
        let pending = Arc::new(PendingPaths::new());
        let lifecycle = Arc::new(Lifecycle::new());
        let submitter = TaskSubmitter::new(
            index.clone(),
            pending.clone(),
            Arc::new(WorkerPool::new(2).unwrap()),
            lifecycle.clone(),
        );
        Fixture {
            temp,
            backend,
            registrar,
            index,
            pending,
            lifecycle,
            submitter,
        }
    }

    #[test]
    fn registers_and_indexes_whole_tree() {
        let fx = fixture();
        let root = fx.temp.path();
        fs::create_dir_all(root.join("a/b")).unwrap();
        fs::write(root.join("top.txt"), "shared top").unwrap();
        fs::write(root.join("a/mid.txt"), "shared mid").unwrap();
        fs::write(root.join("a/b/leaf.txt"), "shared leaf").unwrap();

        let filter = PathFilter::new();
        let walk = RegisterWalk::new(&fx.registrar, &filter, &fx.submitter);
        walk.run(root).unwrap();
        fx.pending.wait_idle(&fx.lifecycle).unwrap();

        assert_eq!(walk.num_dirs.load(Ordering::Relaxed), 3);
        assert_eq!(walk.num_files.load(Ordering::Relaxed), 3);
        assert_eq!(fx.backend.watched().len(), 3);
        assert_eq!(fx.registrar.len(), 6);
        assert_eq!(fx.index.get("shared").map(|v| v.len()), Some(3));
        assert!(fx.index.get("leaf").is_some());
    }

    #[test]
    fn rejected_directory_is_skipped_entirely() {
        let fx = fixture();
        let root = fx.temp.path();
        fs::create_dir_all(root.join("target/debug")).unwrap();
        fs::write(root.join("target/debug/out.txt"), "artifact").unwrap();
        fs::write(root.join("src.txt"), "source").unwrap();

        let filter = PathFilter::from_patterns("/target$").unwrap();
        RegisterWalk::new(&fx.registrar, &filter, &fx.submitter)
            .run(root)
            .unwrap();
        fx.pending.wait_idle(&fx.lifecycle).unwrap();

        assert!(!fx.registrar.is_registered(&root.join("target")));
        assert!(!fx.registrar.is_registered(&root.join("target/debug/out.txt")));
        assert!(fx.index.get("artifact").is_none());
        assert!(fx.index.get("source").is_some());
    }

    #[test]
    fn rejected_files_are_not_registered() {
        let fx = fixture();
        let root = fx.temp.path();
        fs::write(root.join("image.png"), "fake png").unwrap();

        RegisterWalk::new(&fx.registrar, &PathFilter::new(), &fx.submitter)
            .run(root)
            .unwrap();
        assert!(!fx.registrar.is_registered(&root.join("image.png")));
    }

    #[test]
    fn terminated_submitter_aborts_walk() {
        let fx = fixture();
        fs::write(fx.temp.path().join("file.txt"), "words").unwrap();
        fx.lifecycle.terminate();

        let error = RegisterWalk::new(&fx.registrar, &PathFilter::new(), &fx.submitter)
            .run(fx.temp.path())
            .expect_err("terminated");
        assert!(error.is_terminated());
    }

    #[test]
    fn closed_registrar_aborts_walk() {
        let fx = fixture();
        let root = fx.temp.path();
        fs::create_dir_all(root.join("a")).unwrap();
        fs::write(root.join("a/file.txt"), "words").unwrap();
        fx.registrar.close();

        let error = RegisterWalk::new(&fx.registrar, &PathFilter::new(), &fx.submitter)
            .run(root)
            .expect_err("terminated");
        assert!(error.is_terminated());
        assert!(fx.registrar.is_empty());
        assert!(fx.pending.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_directory_is_not_descended() {
        let fx = fixture();
        let root = fx.temp.path();
        let outside = TempDir::new().unwrap();
        fs::write(outside.path().join("far.txt"), "faraway").unwrap();
        std::os::unix::fs::symlink(outside.path(), root.join("link.txt")).unwrap();

        let filter = PathFilter::new();
        let walk = RegisterWalk::new(&fx.registrar, &filter, &fx.submitter);
        walk.run(root).unwrap();
        fx.pending.wait_idle(&fx.lifecycle).unwrap();

        assert_eq!(walk.num_dirs.load(Ordering::Relaxed), 1);
        assert_eq!(fx.backend.watched(), vec![root.to_path_buf()]);
        assert!(!fx.registrar.is_directory(&root.join("link.txt")));
        assert!(!fx.registrar.is_registered(&root.join("link.txt/far.txt")));
        assert!(fx.index.get("faraway").is_none());
    }

    #[cfg(unix)]
    #[test]
    fn walk_started_at_symlink_does_not_descend() {
        let fx = fixture();
        let outside = TempDir::new().unwrap();
        fs::write(outside.path().join("far.txt"), "faraway").unwrap();
        let link = fx.temp.path().join("link");
        std::os::unix::fs::symlink(outside.path(), &link).unwrap();

        let filter = PathFilter::new();
        let walk = RegisterWalk::new(&fx.registrar, &filter, &fx.submitter);
        walk.run(&link).unwrap();
        fx.pending.wait_idle(&fx.lifecycle).unwrap();

        assert_eq!(walk.num_dirs.load(Ordering::Relaxed), 0);
        assert!(fx.backend.watched().is_empty());
        assert!(!fx.registrar.is_registered(&link.join("far.txt")));
        assert!(fx.index.get("faraway").is_none());
    }
}
