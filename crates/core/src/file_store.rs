//! JSON-file-backed key-value store (native stand-in for `localStorage`).
//!
//! The whole store is one JSON object on disk: `{ "<key>": "<value>", ... }`.
//! Every write replaces the file via a temp file + rename.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::{StorageError, StorageResult};
use crate::storage::KeyValueStore;

type Document = BTreeMap<String, String>;

/// A `localStorage` replacement backed by a single JSON file.
///
/// The file is one shared document for every key. If it is not valid JSON,
/// reads fail with [`StorageError::Serialize`] and the next `set_item` or
/// `remove_item` starts a fresh document: every key in the corrupt file is
/// dropped, not only the one being written.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process.
    lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Open the store at `{app_data_dir}/dashboard-shell/storage.json`.
    pub fn open_default() -> StorageResult<Self> {
        Ok(Self::new(default_path()?))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_document(&self) -> StorageResult<Document> {
        match fs::read_to_string(&self.path) {
            Ok(raw) if raw.trim().is_empty() => Ok(Document::new()),
            Ok(raw) => Ok(serde_json::from_str(&raw)?),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(Document::new()),
            Err(err) => Err(err.into()),
        }
    }

    /// Like `read_document`, but a corrupt file is replaced rather than
    /// blocking every future write.
    fn read_document_for_write(&self) -> StorageResult<Document> {
        match self.read_document() {
            Err(StorageError::Serialize(err)) => {
                tracing::warn!(path = %self.path.display(), "discarding corrupt storage file: {err}");
                Ok(Document::new())
            }
            other => other,
        }
    }

    fn write_document(&self, doc: &Document) -> StorageResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let payload = serde_json::to_string_pretty(doc)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, payload)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn guard(&self) -> StorageResult<std::sync::MutexGuard<'_, ()>> {
        self.lock
            .lock()
            .map_err(|_| StorageError::unavailable("file store lock poisoned"))
    }
}

impl KeyValueStore for JsonFileStore {
    fn get_item(&self, key: &str) -> StorageResult<Option<String>> {
        let _guard = self.guard()?;
        Ok(self.read_document()?.remove(key))
    }

    fn set_item(&self, key: &str, value: &str) -> StorageResult<()> {
        let _guard = self.guard()?;
        let mut doc = self.read_document_for_write()?;
        doc.insert(key.to_string(), value.to_string());
        self.write_document(&doc)
    }

    fn remove_item(&self, key: &str) -> StorageResult<()> {
        let _guard = self.guard()?;
        if !self.path.exists() {
            return Ok(());
        }
        let mut doc = self.read_document_for_write()?;
        doc.remove(key);
        self.write_document(&doc)
    }
}

/// Resolve `{app_data_dir}/dashboard-shell/storage.json`.
fn default_path() -> StorageResult<PathBuf> {
    let base = dirs::data_dir()
        .or_else(|| {
            dirs::home_dir().map(|mut h| {
                h.push(".local");
                h.push("share");
                h
            })
        })
        .ok_or_else(|| {
            StorageError::unavailable(
                "failed to resolve OS app data directory - tried data_dir() and home_dir()/.local/share",
            )
        })?;

    let mut path = base;
    path.push("dashboard-shell");
    path.push("storage.json");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_in(dir: &tempfile::TempDir) -> JsonFileStore {
        JsonFileStore::new(dir.path().join("nested").join("storage.json"))
    }

    #[test]
    fn missing_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        assert_eq!(store.get_item("auth").unwrap(), None);
        store.remove_item("auth").unwrap();
        assert!(!store.path().exists());
    }

    #[test]
    fn values_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        store_in(&dir).set_item("auth", r#"{"username":"alice"}"#).unwrap();

        let reopened = store_in(&dir);
        assert_eq!(
            reopened.get_item("auth").unwrap().as_deref(),
            Some(r#"{"username":"alice"}"#)
        );

        reopened.remove_item("auth").unwrap();
        assert_eq!(store_in(&dir).get_item("auth").unwrap(), None);
    }

    #[test]
    fn other_keys_are_preserved() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.set_item("theme", "dark").unwrap();
        store.set_item("auth", "x").unwrap();
        store.remove_item("auth").unwrap();

        assert_eq!(store.get_item("theme").unwrap().as_deref(), Some("dark"));
    }

    #[test]
    fn corrupt_file_fails_reads_but_not_writes() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        fs::write(store.path(), "not json").unwrap();

        assert!(matches!(store.get_item("auth"), Err(StorageError::Serialize(_))));

        store.remove_item("auth").unwrap();
        assert_eq!(store.get_item("auth").unwrap(), None);
    }

    #[test]
    fn write_over_corrupt_file_drops_every_key() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.set_item("theme", "dark").unwrap();
        fs::write(store.path(), r#"{"theme":"dark","auth":"#).unwrap();

        store.remove_item("auth").unwrap();

        assert_eq!(store.get_item("theme").unwrap(), None);
        assert_eq!(fs::read_to_string(store.path()).unwrap().trim(), "{}");
    }
}
