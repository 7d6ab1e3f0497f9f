//! Kolabo core types and utilities
//!
//! Token persistence, storage backends, configuration and logging shared by
//! the HTTP client and the browser bindings.

pub mod config;
pub mod error;
pub mod jwt;
#[cfg(all(feature = "logging", not(target_arch = "wasm32")))]
pub mod logging;
pub mod storage;
pub mod tokens;

pub use config::ClientConfig;
pub use error::{CoreError, CoreResult, StorageError};
pub use storage::{KeyValueStorage, MemoryStorage};
pub use tokens::{DEFAULT_STORAGE_KEY, TokenPair, TokenStore};

#[cfg(not(target_arch = "wasm32"))]
pub use storage::FileStorage;
