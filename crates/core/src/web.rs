//! Browser `localStorage` backend (wasm32 only).

use crate::error::{StorageError, StorageResult};
use crate::storage::KeyValueStore;

/// `window.localStorage`, looked up on every call.
///
/// Holding no JS handles keeps this type `Send + Sync`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalStorage;

impl LocalStorage {
    pub fn new() -> Self {
        Self
    }

    fn storage(&self) -> StorageResult<web_sys::Storage> {
        let window =
            web_sys::window().ok_or_else(|| StorageError::unavailable("no window object"))?;
        window
            .local_storage()
            .map_err(|e| StorageError::unavailable(format!("localStorage denied: {e:?}")))?
            .ok_or_else(|| StorageError::unavailable("localStorage not available"))
    }
}

impl KeyValueStore for LocalStorage {
    fn get_item(&self, key: &str) -> StorageResult<Option<String>> {
        self.storage()?
            .get_item(key)
            .map_err(|e| StorageError::unavailable(format!("{e:?}")))
    }

    fn set_item(&self, key: &str, value: &str) -> StorageResult<()> {
        self.storage()?
            .set_item(key, value)
            .map_err(|e| StorageError::unavailable(format!("{e:?}")))
    }

    fn remove_item(&self, key: &str) -> StorageResult<()> {
        self.storage()?
            .remove_item(key)
            .map_err(|e| StorageError::unavailable(format!("{e:?}")))
    }
}
