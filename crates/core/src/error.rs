//! Common error types shared across the Kolabo crates

/// Standard result type for core operations
pub type CoreResult<T> = std::result::Result<T, CoreError>;

/// Core error types that can be shared across crates
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, thiserror::Error)]
pub enum CoreError {
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("IO operation failed: {message}")]
    Io { message: String },
}

impl CoreError {
    /// Create an invalid config error
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Create an IO error
    pub fn io_error(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }
}

impl From<config::ConfigError> for CoreError {
    fn from(err: config::ConfigError) -> Self {
        Self::invalid_config(err.to_string())
    }
}

/// Errors raised by key-value storage backends
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StorageError {
    /// The backing store could not be reached (no window, quota, permissions)
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    /// Reading or writing an entry failed
    #[error("Storage I/O failed for key '{key}': {message}")]
    Io { key: String, message: String },
}

impl StorageError {
    /// Create an I/O error for a specific key
    pub fn io(key: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::Io {
            key: key.into(),
            message: message.to_string(),
        }
    }
}

impl From<StorageError> for CoreError {
    fn from(err: StorageError) -> Self {
        Self::io_error(err.to_string())
    }
}
