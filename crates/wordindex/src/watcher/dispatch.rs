//! Fan-out of normalized events.

use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;

use super::events::{FsEvent, FsEventKind};
use crate::error::Result;

/// Receives classified filesystem changes.
pub trait EventListener: Send + Sync {
    fn on_file_created(&self, path: &Path) -> Result<()>;
    fn on_file_modified(&self, path: &Path) -> Result<()>;
    fn on_directory_created(&self, path: &Path) -> Result<()>;
    fn on_directory_modified(&self, path: &Path) -> Result<()>;
    /// The deleted path can no longer be inspected, so files and directories
    /// share one callback.
    fn on_deleted(&self, path: &Path) -> Result<()>;

    fn on_overflow(&self, _root: &Path) -> Result<()> {
        Ok(())
    }
}

#[derive(Default)]
pub struct EventDispatcher {
    listeners: RwLock<Vec<Arc<dyn EventListener>>>,
}

impl std::fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("listeners", &self.listeners.read().len())
            .finish()
    }
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_listener(&self, listener: Arc<dyn EventListener>) {
        self.listeners.write().push(listener);
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.read().len()
    }

    /// Classifies `event` and delivers it to every listener in order.
    /// The first listener error stops delivery and is returned.
    pub fn dispatch(&self, event: &FsEvent) -> Result<()> {
        let listeners: Vec<Arc<dyn EventListener>> = self.listeners.read().clone();
        if listeners.is_empty() {
            return Ok(());
        }

        let path = event.full_path();
        log::trace!("dispatching {event}");
        match event.kind {
            FsEventKind::Created | FsEventKind::Modified => {
                let is_dir = path.is_dir();
                for listener in &listeners {
                    match (event.kind, is_dir) {
                        (FsEventKind::Created, true) => listener.on_directory_created(&path)?,
                        (FsEventKind::Created, false) => listener.on_file_created(&path)?,
                        (_, true) => listener.on_directory_modified(&path)?,
                        (_, false) => listener.on_file_modified(&path)?,
                    }
                }
            }
            FsEventKind::Deleted => {
                for listener in &listeners {
                    listener.on_deleted(&path)?;
                }
            }
            FsEventKind::Overflow => {
                for listener in &listeners {
                    listener.on_overflow(&event.root)?;
                }
            }
        }
        Ok(())
    }
}
