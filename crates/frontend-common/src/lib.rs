//! Browser bindings for the Kolabo client
//!
//! Web storage for tokens, the toast and redirect that follow the end of a
//! session, and console logging.

pub mod client;
pub mod logging;
pub mod notice;
pub mod redirect;
pub mod storage;

pub use client::{api_client, create_client, reset_client, resolve_base_url};
pub use logging::init_logging;
pub use notice::{ToastNotifier, clear_toast_callback, set_toast_callback, show_error};
pub use redirect::BrowserRedirect;
pub use storage::{StorageArea, WebStorage};
