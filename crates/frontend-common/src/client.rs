//! Browser client configuration and initialization

use crate::notice::ToastNotifier;
use crate::redirect::BrowserRedirect;
use crate::storage::{StorageArea, WebStorage};
use kolabo_core::ClientConfig;
pub use kolabo_http::ClientError;
use kolabo_http::ApiClient;
use once_cell::sync::Lazy;
use std::sync::{Arc, Mutex, PoisonError};
use web_sys::window;

/// Global client instance
static CLIENT: Lazy<Mutex<Option<ApiClient>>> = Lazy::new(|| Mutex::new(None));

/// Resolve a configured API base URL against the page origin
///
/// Absolute URLs are kept; a path such as `/api` is served by the origin
/// the page was loaded from.
pub fn resolve_base_url(configured: &str) -> String {
    if !configured.starts_with('/') {
        return configured.to_string();
    }

    // Try to get from window location
    if let Some(origin) = window().and_then(|w| w.location().origin().ok()) {
        return format!("{origin}{configured}");
    }

    // Default to relative URLs
    configured.to_string()
}

/// Build a client persisting tokens in `area`, redirecting to the login page
/// and toasting when the session ends
pub fn create_client(config: ClientConfig, area: StorageArea) -> Result<ApiClient, ClientError> {
    let base_url = resolve_base_url(&config.api_base_url);

    ApiClient::builder()
        .base_url(base_url)
        .config(config)
        .storage(Arc::new(WebStorage::new(area)))
        .notifier(Arc::new(ToastNotifier))
        .on_session_end(Arc::new(BrowserRedirect))
        .build()
}

/// Get the shared client instance, creating it with `config` on first use
pub fn api_client(config: &ClientConfig) -> Result<ApiClient, ClientError> {
    let mut client_lock = CLIENT.lock().unwrap_or_else(PoisonError::into_inner);

    if let Some(client) = client_lock.as_ref() {
        return Ok(client.clone());
    }

    let client = create_client(config.clone(), StorageArea::Local)?;
    *client_lock = Some(client.clone());
    Ok(client)
}

/// Drop the shared client so the next [`api_client`] call starts a fresh session
pub fn reset_client() {
    let mut client_lock = CLIENT.lock().unwrap_or_else(PoisonError::into_inner);
    *client_lock = None;
}
