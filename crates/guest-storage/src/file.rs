//! File-backed storage backend.

use crate::{SecureStorage, StorageError, StorageResult};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;

/// Key/value store persisted as a JSON object on disk.
///
/// Every mutation is written through immediately, so a value set before a
/// crash or restart is visible on the next open. This is the persistent
/// scope: tokens and verification state survive restarts here.
pub struct FileStorage {
    path: PathBuf,
    data: Mutex<HashMap<String, String>>,
}

impl FileStorage {
    /// Open (or create) the store at the given path.
    ///
    /// A missing file starts empty; a present file must parse as a JSON
    /// string-to-string object.
    pub fn open(path: impl Into<PathBuf>) -> StorageResult<Self> {
        let path = path.into();

        let data = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            serde_json::from_str(&content).map_err(|e| StorageError::Encoding(e.to_string()))?
        } else {
            HashMap::new()
        };

        debug!(path = %path.display(), entries = data.len(), "Opened file storage");
        Ok(Self {
            path,
            data: Mutex::new(data),
        })
    }

    /// Path this store persists to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, data: &HashMap<String, String>) -> StorageResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            serde_json::to_string_pretty(data).map_err(|e| StorageError::Encoding(e.to_string()))?;
        // Write to a sibling temp file first so a crash mid-write cannot
        // truncate the live store.
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, content)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl SecureStorage for FileStorage {
    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        let mut data = self.data.lock().unwrap();
        data.insert(key.to_string(), value.to_string());
        self.flush(&data)
    }

    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let data = self.data.lock().unwrap();
        Ok(data.get(key).cloned())
    }

    fn delete(&self, key: &str) -> StorageResult<bool> {
        let mut data = self.data.lock().unwrap();
        let existed = data.remove(key).is_some();
        if existed {
            self.flush(&data)?;
        }
        Ok(existed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::open(dir.path().join("store.json")).unwrap();
        assert_eq!(storage.get("anything").unwrap(), None);
    }

    #[test]
    fn test_roundtrip_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");

        {
            let storage = FileStorage::open(&path).unwrap();
            storage.set("access_token", "abc").unwrap();
            storage.set("refresh_token", "def").unwrap();
        }

        let storage = FileStorage::open(&path).unwrap();
        assert_eq!(storage.get("access_token").unwrap(), Some("abc".to_string()));
        assert_eq!(storage.get("refresh_token").unwrap(), Some("def".to_string()));
    }

    #[test]
    fn test_delete_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");

        {
            let storage = FileStorage::open(&path).unwrap();
            storage.set("key", "value").unwrap();
            assert!(storage.delete("key").unwrap());
        }

        let storage = FileStorage::open(&path).unwrap();
        assert_eq!(storage.get("key").unwrap(), None);
    }

    #[test]
    fn test_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("deep").join("store.json");
        let storage = FileStorage::open(&path).unwrap();
        storage.set("key", "value").unwrap();
        assert!(path.exists());
    }
}
