//! Client error types

use thiserror::Error;

/// Client error types
#[derive(Debug, Error)]
pub enum ClientError {
    /// Network or request error
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Failure reported by a non-reqwest transport
    #[error("Transport failed: {0}")]
    Transport(String),

    /// Server returned an error status
    #[error("Server error {status}: {message}")]
    ServerError { status: u16, message: String },

    /// Authentication failed
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Resource not found
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Bad request
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Forbidden
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Request body failed server-side validation
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Rate limited
    #[error("Too many requests: {0}")]
    TooManyRequests(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// The access token could not be refreshed; the session has ended
    #[error("Token refresh failed: {0}")]
    RefreshFailed(#[from] RefreshError),
}

impl ClientError {
    /// Create error from HTTP status code
    pub fn from_status(status: reqwest::StatusCode, message: String) -> Self {
        match status.as_u16() {
            400 => Self::BadRequest(message),
            401 => Self::AuthenticationFailed(message),
            403 => Self::Forbidden(message),
            404 => Self::NotFound(message),
            422 => Self::Validation(message),
            429 => Self::TooManyRequests(message),
            _ => Self::ServerError {
                status: status.as_u16(),
                message,
            },
        }
    }

    /// HTTP status behind this error, when the server answered
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::ServerError { status, .. } => Some(*status),
            Self::AuthenticationFailed(_) => Some(401),
            Self::BadRequest(_) => Some(400),
            Self::Forbidden(_) => Some(403),
            Self::NotFound(_) => Some(404),
            Self::Validation(_) => Some(422),
            Self::TooManyRequests(_) => Some(429),
            Self::RefreshFailed(RefreshError::Rejected { status, .. }) => Some(*status),
            Self::Request(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Whether the error means the caller is no longer authenticated
    pub const fn is_auth_expired(&self) -> bool {
        matches!(self, Self::AuthenticationFailed(_) | Self::RefreshFailed(_))
    }

    /// Short message suitable for showing to a user
    pub fn user_message(&self) -> String {
        let server_message = |message: &str, fallback: &str| {
            if message.trim().is_empty() {
                fallback.to_string()
            } else {
                message.to_string()
            }
        };

        match self {
            Self::BadRequest(m) => server_message(m, "Invalid request data"),
            Self::AuthenticationFailed(m) => server_message(m, "Invalid credentials"),
            Self::Forbidden(m) => server_message(m, "Access forbidden"),
            Self::NotFound(m) => server_message(m, "Endpoint not found"),
            Self::Validation(m) => server_message(m, "Validation failed"),
            Self::TooManyRequests(_) => "Too many requests. Please try again later.".to_string(),
            Self::ServerError { status: 500, .. } => {
                "Server error. Please try again later.".to_string()
            }
            Self::ServerError { message, .. } => {
                server_message(message, "An unexpected error occurred")
            }
            Self::Request(_) | Self::Transport(_) => {
                "Network error. Please check your connection and try again.".to_string()
            }
            Self::RefreshFailed(_) => "Session expired, please login again".to_string(),
            Self::Serialization(_) | Self::Configuration(_) => {
                "An unexpected error occurred".to_string()
            }
        }
    }
}

/// Why a token refresh did not produce a new access token
///
/// Cloneable so one failure can be handed to every caller queued behind the
/// refresh.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RefreshError {
    /// No refresh token is stored
    #[error("No refresh token")]
    NoRefreshToken,

    /// The refresh endpoint answered with a non-success status
    #[error("Refresh rejected with status {status}: {message}")]
    Rejected { status: u16, message: String },

    /// The refresh call never got an answer
    #[error("Refresh request failed: {0}")]
    Transport(String),

    /// The refresh endpoint answered without a usable access token
    #[error("Invalid refresh response: {0}")]
    InvalidResponse(String),

    /// The task performing the refresh was dropped before it finished
    #[error("Refresh abandoned before completion")]
    Abandoned,
}
