//! Client configuration

use crate::error::CoreResult;
use crate::tokens::DEFAULT_STORAGE_KEY;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Environment variable prefix for configuration overrides (`KOLABO_API_BASE_URL`, ...)
pub const ENV_PREFIX: &str = "KOLABO";

/// Settings shared by the HTTP client, the session and the browser bindings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the REST API, without a trailing slash
    pub api_base_url: String,

    /// Per-request timeout in milliseconds (native targets only)
    pub timeout_ms: u64,

    /// Route the host navigates to once a session ends
    pub login_route: String,

    /// Storage key of the serialized token record
    pub storage_key: String,

    /// Delay between the session-ended notification and navigation
    pub redirect_delay_ms: u64,

    /// Path of the token refresh endpoint, relative to the base URL
    pub refresh_path: String,

    /// Also persist tokens under the plain `access_token` / `refresh_token` keys
    pub mirror_legacy_keys: bool,

    /// Log level filter used when `RUST_LOG` is unset
    pub log_level: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:3000/api".to_string(),
            timeout_ms: 15_000,
            login_route: "/login-register".to_string(),
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            redirect_delay_ms: 40,
            refresh_path: "/auth/refresh".to_string(),
            mirror_legacy_keys: false,
            log_level: "info".to_string(),
        }
    }
}

impl ClientConfig {
    /// Load configuration from a file, with `KOLABO_*` environment overrides
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or a value fails to parse
    pub fn from_file<P: AsRef<std::path::Path>>(path: P) -> CoreResult<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(config::Environment::with_prefix(ENV_PREFIX))
            .build()?;

        Ok(settings.try_deserialize::<Self>()?.normalized())
    }

    /// Load configuration from defaults and `KOLABO_*` environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if an environment variable cannot be parsed
    pub fn from_env() -> CoreResult<Self> {
        let defaults = Self::default();

        let settings = config::Config::builder()
            .set_default("api_base_url", defaults.api_base_url)?
            .set_default("timeout_ms", defaults.timeout_ms)?
            .set_default("login_route", defaults.login_route)?
            .set_default("storage_key", defaults.storage_key)?
            .set_default("redirect_delay_ms", defaults.redirect_delay_ms)?
            .set_default("refresh_path", defaults.refresh_path)?
            .set_default("mirror_legacy_keys", defaults.mirror_legacy_keys)?
            .set_default("log_level", defaults.log_level)?
            .add_source(config::Environment::with_prefix(ENV_PREFIX))
            .build()?;

        Ok(settings.try_deserialize::<Self>()?.normalized())
    }

    /// Request timeout as a [`Duration`]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Redirect delay as a [`Duration`]
    pub const fn redirect_delay(&self) -> Duration {
        Duration::from_millis(self.redirect_delay_ms)
    }

    /// Absolute URL of the refresh endpoint
    pub fn refresh_url(&self) -> String {
        format!("{}{}", self.api_base_url, self.refresh_path)
    }

    fn normalized(mut self) -> Self {
        self.api_base_url = self.api_base_url.trim_end_matches('/').to_string();
        if !self.refresh_path.starts_with('/') {
            self.refresh_path.insert(0, '/');
        }
        self
    }
}
