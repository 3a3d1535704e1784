//! Filesystem watching module.
//!
//! This module handles real-time filesystem monitoring:
//! - `backend` - OS watch registration (notify on every platform)
//! - `registrar` - the registration tree of every watched path
//! - `events` - normalization of raw notify events
//! - `dispatch` - fan-out of normalized events to listeners
//! - `change` - the polling thread that connects the two

mod backend;
mod change;
mod dispatch;
mod events;
mod registrar;

pub use backend::{NotifyBackend, RawEventReceiver, WatchBackend, WatchHandle};
#[cfg(test)]
pub(crate) use backend::testing;
pub use change::{ChangeWatcher, WATCHER_POLL_INTERVAL};
pub use dispatch::{EventDispatcher, EventListener};
pub use events::{normalize_event, FsEvent, FsEventKind};
pub use registrar::{FsEntry, Registrar};
