//! Storage layer for the inverted index.
//!
//! This module provides the low-level data storage primitives:
//! - `ValueStorage`, the set of paths recorded for one word
//! - `IndexStorage`, the word → `ValueStorage` mapping behind one lock

mod index_storage;
mod value;

pub use index_storage::IndexStorage;
pub use value::ValueStorage;
