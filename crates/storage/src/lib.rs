//! Storage collaborators for sitegate.
//!
//! The engines never touch storage themselves; the coordinator loads a
//! project snapshot through these traits and writes back what the engines
//! propose. Two backends ship here: an in-memory one and a JSON-file one.

#![warn(missing_docs)]

pub mod trait_;
pub mod memory_storage;
pub mod json_storage;

pub use trait_::{TaskStore, AlertStore, StorageError, Result};
pub use memory_storage::MemoryStorage;
pub use json_storage::JsonStorage;
