//! Kolabo API client
//!
//! Every request goes through [`ApiClient::send`], which attaches the stored
//! access token and recovers from an expired one: the first 401 triggers a
//! single shared token refresh and the request is replayed once with the new
//! token. Failures that cannot be recovered end the session.

pub mod auth;
pub mod error;
pub mod request;
pub mod team;
pub mod transport;
pub mod users;

use crate::session::{Notifier, Session, SessionEndHook, SessionEndReason};
use crate::types::{RefreshRequest, RefreshResponse};
use error::{ClientError, RefreshError};
use kolabo_core::{ClientConfig, KeyValueStorage, MemoryStorage, TokenPair};
use request::{ApiRequest, ApiResponse};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use transport::{ReqwestTransport, Transport};

/// Session-aware Kolabo API client
#[derive(Clone)]
pub struct ApiClient {
    session: Arc<Session>,
    transport: Arc<dyn Transport>,
    base_url: String,
    refresh_path: String,
}

impl ApiClient {
    /// Create a new client builder
    pub fn builder() -> ApiClientBuilder {
        ApiClientBuilder::default()
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Session shared by every clone of this client
    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Start a request for `path` relative to the base URL
    pub fn request(&self, method: Method, path: &str) -> ApiRequest {
        ApiRequest::new(method, &self.base_url, path)
    }

    /// Send a request through the authorization pipeline
    ///
    /// Responses other than 401 are returned as they are, whatever their
    /// status. A 401 is answered by refreshing the access token (sharing any
    /// refresh already in flight) and replaying the request once.
    ///
    /// # Errors
    ///
    /// Returns transport failures unchanged, the refresh failure if the token
    /// could not be refreshed, and `AuthenticationFailed` when the session had
    /// to end without a refresh.
    pub async fn send(&self, mut request: ApiRequest) -> Result<ApiResponse, ClientError> {
        loop {
            let tokens = self.session.tokens();
            tokens.load();
            request.attach_bearer(tokens.access());

            let response = self.transport.send(&request).await?;
            if response.status() != StatusCode::UNAUTHORIZED || !request.intercepts_auth() {
                return Ok(response);
            }

            if request.is_retry() {
                tracing::warn!(path = request.path(), "Replayed request rejected; ending session");
                self.session.end(SessionEndReason::NotAuthenticated);
                return Err(response.into_error());
            }

            if request.targets(&self.refresh_path) {
                tracing::warn!("Refresh endpoint rejected the session");
                self.session.end(SessionEndReason::SessionExpired);
                return Err(response.into_error());
            }

            if tokens.refresh().is_none() {
                tracing::info!(path = request.path(), "Unauthorized without a refresh token");
                self.session.end(SessionEndReason::NotAuthenticated);
                return Err(response.into_error());
            }

            tracing::debug!(path = request.path(), "Access token rejected; refreshing");
            let token = self.refresh_now().await?;
            request.prepare_replay(token);
        }
    }

    /// Send a request and decode a successful JSON response
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails, the server answers with a
    /// non-success status, or the body does not decode as `T`
    pub async fn execute<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ClientError> {
        let response = self.send(request).await?;
        if response.is_success() {
            response.json()
        } else {
            Err(response.into_error())
        }
    }

    /// Send a request whose response body is not needed
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server answers with a
    /// non-success status
    pub async fn execute_empty(&self, request: ApiRequest) -> Result<(), ClientError> {
        let response = self.send(request).await?;
        if response.is_success() {
            Ok(())
        } else {
            Err(response.into_error())
        }
    }

    /// Refresh the access token now, or join the refresh already in flight
    ///
    /// # Errors
    ///
    /// Returns `RefreshFailed` when no new token could be obtained; the
    /// session has ended by then
    pub async fn refresh_now(&self) -> Result<String, ClientError> {
        self.session
            .refresh_access(|refresh_token| self.exchange_refresh_token(refresh_token))
            .await
            .map_err(ClientError::from)
    }

    /// Trade a refresh token for a new pair
    ///
    /// Goes to the transport directly so the exchange itself can never
    /// re-enter the refresh logic.
    async fn exchange_refresh_token(&self, refresh_token: String) -> Result<TokenPair, RefreshError> {
        let request = self
            .request(Method::POST, &self.refresh_path)
            .without_session()
            .json(&RefreshRequest { refresh_token })
            .map_err(|e| RefreshError::InvalidResponse(e.to_string()))?;

        let response = self
            .transport
            .send(&request)
            .await
            .map_err(|e| RefreshError::Transport(e.to_string()))?;

        if !response.is_success() {
            return Err(RefreshError::Rejected {
                status: response.status().as_u16(),
                message: response.error_message(),
            });
        }

        let body: RefreshResponse = response
            .json()
            .map_err(|e| RefreshError::InvalidResponse(e.to_string()))?;
        Ok(body.into())
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("refresh_path", &self.refresh_path)
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

/// Builder for ApiClient
#[derive(Default)]
pub struct ApiClientBuilder {
    config: Option<ClientConfig>,
    base_url: Option<String>,
    timeout: Option<Duration>,
    user_agent: Option<String>,
    session: Option<Arc<Session>>,
    storage: Option<Arc<dyn KeyValueStorage>>,
    transport: Option<Arc<dyn Transport>>,
    notifier: Option<Arc<dyn Notifier>>,
    hook: Option<Arc<dyn SessionEndHook>>,
}

impl ApiClientBuilder {
    /// Take base URL, timeout, refresh path and session settings from `config`
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the base URL, overriding the configured one
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the request timeout (ignored on WASM)
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the user agent
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Use an existing session instead of building one
    pub fn session(mut self, session: Arc<Session>) -> Self {
        self.session = Some(session);
        self
    }

    /// Persist tokens in `storage` (in memory by default)
    pub fn storage(mut self, storage: Arc<dyn KeyValueStorage>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Send requests through `transport` instead of reqwest
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Notifier for the built session; ignored when a session is supplied
    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Session-end hook for the built session; ignored when a session is supplied
    pub fn on_session_end(mut self, hook: Arc<dyn SessionEndHook>) -> Self {
        self.hook = Some(hook);
        self
    }

    /// Build the client
    pub fn build(self) -> Result<ApiClient, ClientError> {
        let has_config = self.config.is_some();
        let config = self.config.unwrap_or_default();

        let base_url = self
            .base_url
            .or_else(|| has_config.then(|| config.api_base_url.clone()))
            .ok_or_else(|| ClientError::Configuration("base_url is required".into()))?;

        // Ensure base_url ends without a trailing slash
        let base_url = base_url.trim_end_matches('/').to_string();

        let transport = match self.transport {
            Some(transport) => transport,
            None => {
                let timeout = self.timeout.or_else(|| has_config.then(|| config.timeout()));
                let transport = match &self.user_agent {
                    Some(agent) => ReqwestTransport::with_user_agent(timeout, agent)?,
                    None => ReqwestTransport::new(timeout)?,
                };
                Arc::new(transport)
            }
        };

        let session = match self.session {
            Some(session) => session,
            None => {
                let storage = self
                    .storage
                    .unwrap_or_else(|| Arc::new(MemoryStorage::new()));
                let mut builder = Session::builder(storage).config(&config);
                if let Some(notifier) = self.notifier {
                    builder = builder.notifier(notifier);
                }
                if let Some(hook) = self.hook {
                    builder = builder.on_session_end(hook);
                }
                Arc::new(builder.build())
            }
        };

        tracing::debug!(%base_url, "API client configured");

        Ok(ApiClient {
            session,
            transport,
            base_url,
            refresh_path: config.refresh_path,
        })
    }
}
