//! Access/refresh token pair and its persistent store

use crate::storage::KeyValueStorage;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, PoisonError};

/// Default storage key for the serialized token record
pub const DEFAULT_STORAGE_KEY: &str = "kolabo_tokens";

/// Plain keys written alongside the record when legacy mirroring is enabled
const LEGACY_ACCESS_KEY: &str = "access_token";
const LEGACY_REFRESH_KEY: &str = "refresh_token";

/// Access/refresh credential pair
///
/// Serialized as `{"access_token": ..., "refresh_token": ...}`; the camelCase
/// spellings are accepted when reading.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    #[serde(default, alias = "accessToken")]
    pub access_token: Option<String>,
    #[serde(default, alias = "refreshToken")]
    pub refresh_token: Option<String>,
}

impl TokenPair {
    /// Pair with both tokens present
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: Some(access_token.into()),
            refresh_token: Some(refresh_token.into()),
        }
    }

    /// Pair carrying only an access token (refresh responses without rotation)
    pub fn access_only(access_token: impl Into<String>) -> Self {
        Self {
            access_token: Some(access_token.into()),
            refresh_token: None,
        }
    }

    /// Whether neither token is present
    pub fn is_empty(&self) -> bool {
        self.access_token.is_none() && self.refresh_token.is_none()
    }

    /// Overwrite fields with the non-empty fields of `other`
    fn merge(&mut self, other: Self) {
        if let Some(access) = other.access_token.filter(|t| !t.is_empty()) {
            self.access_token = Some(access);
        }
        if let Some(refresh) = other.refresh_token.filter(|t| !t.is_empty()) {
            self.refresh_token = Some(refresh);
        }
    }
}

/// In-memory token state mirrored to a [`KeyValueStorage`] under one key
///
/// Storage can change behind our back (another tab, another process sharing
/// the directory), so callers refresh the in-memory copy with [`load`](Self::load)
/// before trusting it.
pub struct TokenStore {
    storage: Arc<dyn KeyValueStorage>,
    key: String,
    mirror_legacy_keys: bool,
    current: Mutex<TokenPair>,
}

impl TokenStore {
    /// Create a store over `storage`, writing the record under `key`
    ///
    /// The in-memory state starts empty; call [`load`](Self::load) to pick
    /// up a previously persisted record.
    pub fn new(storage: Arc<dyn KeyValueStorage>, key: impl Into<String>) -> Self {
        Self {
            storage,
            key: key.into(),
            mirror_legacy_keys: false,
            current: Mutex::new(TokenPair::default()),
        }
    }

    /// Also write the plain `access_token` / `refresh_token` keys
    pub fn with_legacy_keys(mut self, enabled: bool) -> Self {
        self.mirror_legacy_keys = enabled;
        self
    }

    /// Storage key of the serialized record
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Merge the provided tokens into the current pair and persist the result
    ///
    /// Absent fields keep their current value. Persistence failures are
    /// logged; the in-memory state is updated regardless.
    pub fn set(&self, pair: TokenPair) -> TokenPair {
        let merged = {
            let mut current = self.lock();
            current.merge(pair);
            current.clone()
        };

        match serde_json::to_string(&merged) {
            Ok(serialized) => {
                if let Err(e) = self.storage.set_item(&self.key, &serialized) {
                    tracing::warn!(key = %self.key, error = %e, "Failed to persist tokens");
                }
            }
            Err(e) => tracing::warn!(error = %e, "Failed to serialize tokens"),
        }

        if self.mirror_legacy_keys {
            if let Some(access) = &merged.access_token {
                let _ = self.storage.set_item(LEGACY_ACCESS_KEY, access);
            }
            if let Some(refresh) = &merged.refresh_token {
                let _ = self.storage.set_item(LEGACY_REFRESH_KEY, refresh);
            }
        }

        merged
    }

    /// Repopulate the in-memory pair from storage
    ///
    /// A missing, unreadable or corrupt record leaves the current state
    /// untouched. Fields absent from the record keep their in-memory value.
    pub fn load(&self) {
        let raw = match self.storage.get_item(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return,
            Err(e) => {
                tracing::debug!(key = %self.key, error = %e, "Token storage unreadable");
                return;
            }
        };

        match serde_json::from_str::<TokenPair>(&raw) {
            Ok(stored) => self.lock().merge(stored),
            Err(e) => tracing::debug!(key = %self.key, error = %e, "Ignoring corrupt token record"),
        }
    }

    /// Forget both tokens and remove the persisted record
    pub fn clear(&self) {
        *self.lock() = TokenPair::default();

        if let Err(e) = self.storage.remove_item(&self.key) {
            tracing::warn!(key = %self.key, error = %e, "Failed to remove persisted tokens");
        }
        if self.mirror_legacy_keys {
            let _ = self.storage.remove_item(LEGACY_ACCESS_KEY);
            let _ = self.storage.remove_item(LEGACY_REFRESH_KEY);
        }
    }

    /// Current access token
    pub fn access(&self) -> Option<String> {
        self.lock().access_token.clone()
    }

    /// Current refresh token
    pub fn refresh(&self) -> Option<String> {
        self.lock().refresh_token.clone()
    }

    /// Copy of the current pair
    pub fn snapshot(&self) -> TokenPair {
        self.lock().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, TokenPair> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let current = self.lock();
        f.debug_struct("TokenStore")
            .field("key", &self.key)
            .field("has_access", &current.access_token.is_some())
            .field("has_refresh", &current.refresh_token.is_some())
            .finish_non_exhaustive()
    }
}
