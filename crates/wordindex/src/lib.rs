//! Live word index over watched directory trees.
//!
//! This crate provides:
//! - An in-memory word → path index with inverted and compact layouts
//! - Recursive directory registration with per-directory OS watches
//! - Event-driven re-indexing on a fixed worker pool with debouncing
//! - Path filtering (ignore expressions, binary heuristic)

pub mod config;
pub mod error;
pub mod filter;
pub mod index;
pub mod indexer;
pub mod lifecycle;
pub mod manager;
pub mod storage;
pub mod watcher;

// Re-export main types
pub use config::{IndexConfig, IndexKind};
pub use error::{IndexError, Result};
pub use filter::PathFilter;
pub use index::{Index, TextWordExtractor, WordExtractor};
pub use lifecycle::LifecycleState;
pub use manager::WordIndexManager;
pub use storage::ValueStorage;
