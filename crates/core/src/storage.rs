//! Durable key-value storage abstraction.
//!
//! Mirrors the browser `localStorage` contract: string keys, string values,
//! synchronous access. Implementations decide where the bytes live.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::error::{StorageError, StorageResult};

/// Synchronous string key-value store.
///
/// Removing a missing key is not an error.
pub trait KeyValueStore: Send + Sync {
    fn get_item(&self, key: &str) -> StorageResult<Option<String>>;

    fn set_item(&self, key: &str, value: &str) -> StorageResult<()>;

    fn remove_item(&self, key: &str) -> StorageResult<()>;
}

impl<S> KeyValueStore for Arc<S>
where
    S: KeyValueStore + ?Sized,
{
    fn get_item(&self, key: &str) -> StorageResult<Option<String>> {
        (**self).get_item(key)
    }

    fn set_item(&self, key: &str, value: &str) -> StorageResult<()> {
        (**self).set_item(key, value)
    }

    fn remove_item(&self, key: &str) -> StorageResult<()> {
        (**self).remove_item(key)
    }
}

/// In-memory store for tests/dev.
///
/// Contents are lost when the process exits.
#[derive(Debug, Default)]
pub struct MemoryStore {
    items: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a value (builder style).
    pub fn with_item(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        if let Ok(mut items) = self.items.lock() {
            items.insert(key.into(), value.into());
        }
        self
    }

    pub fn len(&self) -> usize {
        self.items.lock().map(|items| items.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyValueStore for MemoryStore {
    fn get_item(&self, key: &str) -> StorageResult<Option<String>> {
        let items = self
            .items
            .lock()
            .map_err(|_| StorageError::unavailable("memory store lock poisoned"))?;
        Ok(items.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> StorageResult<()> {
        let mut items = self
            .items
            .lock()
            .map_err(|_| StorageError::unavailable("memory store lock poisoned"))?;
        items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> StorageResult<()> {
        let mut items = self
            .items
            .lock()
            .map_err(|_| StorageError::unavailable("memory store lock poisoned"))?;
        items.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_get_remove() {
        let store = MemoryStore::new();
        assert_eq!(store.get_item("auth").unwrap(), None);

        store.set_item("auth", "{}").unwrap();
        assert_eq!(store.get_item("auth").unwrap().as_deref(), Some("{}"));

        store.remove_item("auth").unwrap();
        assert_eq!(store.get_item("auth").unwrap(), None);
        assert!(store.is_empty());
    }

    #[test]
    fn removing_missing_key_is_ok() {
        let store = MemoryStore::new();
        store.remove_item("nope").unwrap();
    }

    #[test]
    fn shared_handle_sees_same_items() {
        let store = Arc::new(MemoryStore::new().with_item("k", "v"));
        let as_trait: Arc<dyn KeyValueStore> = store.clone();

        as_trait.set_item("k2", "v2").unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.get_item("k").unwrap().as_deref(), Some("v"));
    }
}
