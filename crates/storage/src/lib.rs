//! Storage abstraction and implementations for Abracadabra.
//!
//! This crate provides a trait-based key-value storage interface with an
//! in-memory backend and a JSON-file reference implementation.

#![warn(missing_docs)]

pub mod trait_;
pub mod memory;
#[cfg(feature = "json")]
pub mod json_storage;

pub use trait_::{KeyValueStore, StorageError, Result};
pub use memory::MemoryStore;
#[cfg(feature = "json")]
pub use json_storage::JsonStorage;
