//! `localStorage` / `sessionStorage` as a token storage backend

use kolabo_core::{KeyValueStorage, StorageError};

/// Which browser storage area to use
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StorageArea {
    /// Survives browser restarts
    #[default]
    Local,
    /// Cleared when the tab closes
    Session,
}

/// [`KeyValueStorage`] over the browser's web storage
///
/// Values are stored as plain strings so records stay readable from
/// devtools and other scripts sharing the origin.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebStorage {
    area: StorageArea,
}

impl WebStorage {
    pub const fn new(area: StorageArea) -> Self {
        Self { area }
    }

    pub const fn local() -> Self {
        Self::new(StorageArea::Local)
    }

    pub const fn session() -> Self {
        Self::new(StorageArea::Session)
    }

    pub const fn area(&self) -> StorageArea {
        self.area
    }

    fn raw(&self) -> Result<web_sys::Storage, StorageError> {
        let window = web_sys::window()
            .ok_or_else(|| StorageError::Unavailable("no window".to_string()))?;
        let storage = match self.area {
            StorageArea::Local => window.local_storage(),
            StorageArea::Session => window.session_storage(),
        };

        storage
            .map_err(|e| StorageError::Unavailable(format!("{e:?}")))?
            .ok_or_else(|| StorageError::Unavailable(format!("{:?} storage disabled", self.area)))
    }
}

impl KeyValueStorage for WebStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.raw()?
            .get_item(key)
            .map_err(|e| StorageError::io(key, format!("{e:?}")))
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        // Quota exceeded and private-mode failures land here
        self.raw()?
            .set_item(key, value)
            .map_err(|e| StorageError::io(key, format!("{e:?}")))
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        self.raw()?
            .remove_item(key)
            .map_err(|e| StorageError::io(key, format!("{e:?}")))
    }
}
