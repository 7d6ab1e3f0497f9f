//! Synchronous key-value storage backends
//!
//! The token store persists its record through [`KeyValueStorage`], which
//! mirrors the browser `Storage` API (`getItem` / `setItem` / `removeItem`).
//! Browser-backed implementations live in `kolabo-frontend-common`; this
//! module provides the in-memory and file-backed variants.

use crate::error::StorageError;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

/// A synchronous string key-value store
pub trait KeyValueStorage: Send + Sync {
    /// Read the value stored under `key`, if any
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` under `key`, replacing any previous value
    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove the value stored under `key`; removing a missing key is not an error
    fn remove_item(&self, key: &str) -> Result<(), StorageError>;
}

/// Process-local storage, lost when the value is dropped
#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries
    pub fn len(&self) -> usize {
        self.items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether the store holds no entries
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyValueStorage for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        let items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(items.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        let mut items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        items.remove(key);
        Ok(())
    }
}

#[cfg(not(target_arch = "wasm32"))]
pub use file::FileStorage;

#[cfg(not(target_arch = "wasm32"))]
mod file {
    use super::KeyValueStorage;
    use crate::error::StorageError;
    use std::fs;
    use std::io::ErrorKind;
    use std::path::{Path, PathBuf};

    /// File-backed storage: one file per key inside a directory
    ///
    /// Writes go through a temporary file followed by a rename, so a reader
    /// never observes a half-written record.
    #[derive(Debug, Clone)]
    pub struct FileStorage {
        directory: PathBuf,
    }

    impl FileStorage {
        /// Create a store rooted at `directory` (created lazily on first write)
        pub fn new(directory: impl Into<PathBuf>) -> Self {
            Self {
                directory: directory.into(),
            }
        }

        /// Store rooted in the platform data directory (`<data_dir>/kolabo`)
        pub fn in_data_dir() -> Self {
            let base = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
            Self::new(base.join("kolabo"))
        }

        /// Directory holding the stored entries
        pub fn directory(&self) -> &Path {
            &self.directory
        }

        fn path_for(&self, key: &str) -> PathBuf {
            let name: String = key
                .chars()
                .map(|c| {
                    if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                        c
                    } else {
                        '_'
                    }
                })
                .collect();
            self.directory.join(format!("{name}.json"))
        }
    }

    impl KeyValueStorage for FileStorage {
        fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
            match fs::read_to_string(self.path_for(key)) {
                Ok(contents) => Ok(Some(contents)),
                Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
                Err(e) => Err(StorageError::io(key, e)),
            }
        }

        fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
            fs::create_dir_all(&self.directory).map_err(|e| StorageError::io(key, e))?;

            let path = self.path_for(key);
            let tmp = path.with_extension("json.tmp");
            fs::write(&tmp, value).map_err(|e| StorageError::io(key, e))?;
            fs::rename(&tmp, &path).map_err(|e| StorageError::io(key, e))
        }

        fn remove_item(&self, key: &str) -> Result<(), StorageError> {
            match fs::remove_file(self.path_for(key)) {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
                Err(e) => Err(StorageError::io(key, e)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_storage_get_set_remove() {
        let storage = MemoryStorage::new();
        assert_eq!(storage.get_item("k").unwrap(), None);

        storage.set_item("k", "v1").unwrap();
        storage.set_item("k", "v2").unwrap();
        assert_eq!(storage.get_item("k").unwrap().as_deref(), Some("v2"));
        assert_eq!(storage.len(), 1);

        storage.remove_item("k").unwrap();
        storage.remove_item("k").unwrap();
        assert!(storage.is_empty());
    }

    #[cfg(not(target_arch = "wasm32"))]
    #[test]
    fn file_storage_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();

        let first = FileStorage::new(dir.path().join("nested"));
        first.set_item("kolabo_tokens", r#"{"a":1}"#).unwrap();

        let second = FileStorage::new(dir.path().join("nested"));
        assert_eq!(
            second.get_item("kolabo_tokens").unwrap().as_deref(),
            Some(r#"{"a":1}"#)
        );

        second.remove_item("kolabo_tokens").unwrap();
        assert_eq!(first.get_item("kolabo_tokens").unwrap(), None);
        // Removing again is fine
        first.remove_item("kolabo_tokens").unwrap();
    }

    #[cfg(not(target_arch = "wasm32"))]
    #[test]
    fn file_storage_sanitizes_keys() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path());

        storage.set_item("../escape/me", "x").unwrap();
        assert!(dir.path().join("___escape_me.json").exists());
        assert_eq!(storage.get_item("../escape/me").unwrap().as_deref(), Some("x"));
    }

    #[cfg(not(target_arch = "wasm32"))]
    #[test]
    fn data_dir_storage_lives_under_kolabo() {
        let storage = FileStorage::in_data_dir();
        assert!(storage.directory().ends_with("kolabo"));
        if let Some(base) = dirs::data_dir() {
            assert_eq!(storage.directory(), base.join("kolabo"));
        }
    }
}
