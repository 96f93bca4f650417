//! `shell-core`: foundation shared by the shell crates.
//!
//! This crate holds the host-facing primitives (durable key-value storage and
//! time) so the session and event layers stay free of platform concerns.

pub mod clock;
pub mod error;
pub mod storage;

#[cfg(not(target_arch = "wasm32"))]
pub mod file_store;

#[cfg(target_arch = "wasm32")]
pub mod web;

pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{StorageError, StorageResult};
pub use storage::{KeyValueStore, MemoryStore};

#[cfg(not(target_arch = "wasm32"))]
pub use file_store::JsonFileStore;

#[cfg(target_arch = "wasm32")]
pub use web::LocalStorage;
