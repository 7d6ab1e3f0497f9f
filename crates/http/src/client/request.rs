//! Replayable request and buffered response values
//!
//! `reqwest::RequestBuilder` cannot be cloned reliably, but a request that
//! fails with 401 has to be sent a second time after a token refresh. The
//! pipeline therefore works on [`ApiRequest`], a plain value the transport
//! turns into a network call.

use super::error::ClientError;
use bytes::Bytes;
use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;

/// An outgoing API request
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    path: String,
    url: String,
    query: Vec<(String, String)>,
    headers: HeaderMap,
    body: Option<Bytes>,
    intercept_auth: bool,
    retried: bool,
    replay_token: Option<String>,
}

impl ApiRequest {
    /// Request for `path` relative to `base_url`
    pub fn new(method: Method, base_url: &str, path: &str) -> Self {
        Self {
            method,
            path: path.to_string(),
            url: format!("{base_url}{path}"),
            query: Vec::new(),
            headers: HeaderMap::new(),
            body: None,
            intercept_auth: true,
            retried: false,
            replay_token: None,
        }
    }

    /// Append a query parameter
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Set a header, replacing any previous value
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Serialize `body` as the JSON request body
    ///
    /// # Errors
    ///
    /// Returns an error if `body` cannot be serialized
    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self, ClientError> {
        self.body = Some(Bytes::from(serde_json::to_vec(body)?));
        self.headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        Ok(self)
    }

    /// Raw request body with an explicit content type
    pub fn body(mut self, body: impl Into<Bytes>, content_type: HeaderValue) -> Self {
        self.body = Some(body.into());
        self.headers.insert(header::CONTENT_TYPE, content_type);
        self
    }

    /// Let 401 responses through untouched instead of starting a token refresh
    ///
    /// Used for credential exchanges (login, registration) where a 401 means
    /// "wrong credentials", not "expired session".
    pub fn without_session(mut self) -> Self {
        self.intercept_auth = false;
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn query_pairs(&self) -> &[(String, String)] {
        &self.query
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body_bytes(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    /// Bearer token currently attached, if any
    pub fn bearer(&self) -> Option<&str> {
        self.headers
            .get(header::AUTHORIZATION)?
            .to_str()
            .ok()?
            .strip_prefix("Bearer ")
    }

    /// Whether this request has already been replayed after a refresh
    pub const fn is_retry(&self) -> bool {
        self.retried
    }

    pub(crate) const fn intercepts_auth(&self) -> bool {
        self.intercept_auth
    }

    /// Whether the request path ends with `suffix` (ignoring a trailing slash)
    pub(crate) fn targets(&self, suffix: &str) -> bool {
        self.path.trim_end_matches('/').ends_with(suffix)
    }

    /// Mark the request for its single replay with the refreshed token
    pub(crate) fn prepare_replay(&mut self, token: String) {
        self.retried = true;
        self.replay_token = Some(token);
    }

    /// Attach `Authorization: Bearer <token>`, preferring the replay token
    pub(crate) fn attach_bearer(&mut self, stored: Option<String>) {
        let Some(token) = self.replay_token.clone().or(stored) else {
            return;
        };

        match HeaderValue::from_str(&format!("Bearer {token}")) {
            Ok(value) => {
                self.headers.insert(header::AUTHORIZATION, value);
            }
            Err(_) => tracing::warn!("Access token is not a valid header value; sending without it"),
        }
    }
}

/// A fully buffered API response
#[derive(Debug, Clone)]
pub struct ApiResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl ApiResponse {
    pub fn new(status: StatusCode, headers: HeaderMap, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers,
            body: body.into(),
        }
    }

    pub const fn status(&self) -> StatusCode {
        self.status
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn bytes(&self) -> &Bytes {
        &self.body
    }

    /// Body decoded as UTF-8, lossily
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Decode the body as JSON
    ///
    /// # Errors
    ///
    /// Returns an error if the body is not valid JSON for `T`
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ClientError> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// Human-readable error message carried by a failed response
    ///
    /// Prefers the JSON `message` field (joining arrays of validation
    /// messages), then the raw body, then the status reason.
    pub fn error_message(&self) -> String {
        if let Ok(value) = serde_json::from_slice::<serde_json::Value>(&self.body) {
            match value.get("message") {
                Some(serde_json::Value::String(message)) => return message.clone(),
                Some(serde_json::Value::Array(messages)) => {
                    return messages
                        .iter()
                        .filter_map(|m| m.as_str())
                        .collect::<Vec<_>>()
                        .join(", ");
                }
                _ => {}
            }
        }

        let text = self.text();
        if text.trim().is_empty() {
            self.status.to_string()
        } else {
            text
        }
    }

    /// Convert a failed response into the matching [`ClientError`]
    pub fn into_error(self) -> ClientError {
        let message = self.error_message();
        ClientError::from_status(self.status, message)
    }
}
