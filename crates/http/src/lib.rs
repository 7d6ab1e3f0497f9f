//! Kolabo HTTP client
//!
//! A session-aware REST client: bearer token injection, single-flight token
//! refresh with one replay per request, and one-shot session termination.

pub mod client;
pub mod session;
pub mod types;

pub use client::error::{ClientError, RefreshError};
pub use client::request::{ApiRequest, ApiResponse};
pub use client::transport::{ReqwestTransport, Transport};
pub use client::users::UserQuery;
pub use client::{ApiClient, ApiClientBuilder};
pub use session::{
    Notifier, RefreshCoordinator, Session, SessionBuilder, SessionEndHook, SessionEndReason,
    SessionEnded, SessionTerminator,
};

/// Result type for client operations
pub type Result<T> = std::result::Result<T, ClientError>;
