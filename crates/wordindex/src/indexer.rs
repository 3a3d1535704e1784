//! Background indexing.
//!
//! Paths flow from the watcher (or an explicit registration walk) into a
//! pending set, then onto a fixed worker pool that updates the index.
//!
//! - `pending` - debounce set and idle tracking
//! - `pool` - worker threads
//! - `submit` - update/remove task submission
//! - `walk` - parallel recursive registration
//! - `listener` - watcher events to index work

mod listener;
mod pending;
mod pool;
mod submit;
mod walk;

pub use listener::IndexingListener;
pub use pending::PendingPaths;
pub use pool::{Job, WorkerPool};
pub use submit::{TaskKind, TaskSubmitter};
pub use walk::RegisterWalk;
