//! Network transport behind the request pipeline

use super::error::ClientError;
use super::request::{ApiRequest, ApiResponse};
use async_trait::async_trait;
use reqwest::{Client, ClientBuilder};
use std::time::Duration;

/// Default user agent sent by [`ReqwestTransport`]
pub const USER_AGENT: &str = concat!("kolabo-client/", env!("CARGO_PKG_VERSION"));

/// Performs the actual network call for a prepared request
///
/// Any answer from the server, including error statuses, is an `Ok`
/// response; `Err` is reserved for failures to get an answer at all.
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, ClientError>;
}

/// [`Transport`] over a shared `reqwest::Client`
#[derive(Clone, Debug)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Create a transport with an optional request timeout
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying client cannot be built
    pub fn new(timeout: Option<Duration>) -> Result<Self, ClientError> {
        Self::with_user_agent(timeout, USER_AGENT)
    }

    /// Create a transport sending `user_agent` instead of the default
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying client cannot be built
    pub fn with_user_agent(
        timeout: Option<Duration>,
        user_agent: &str,
    ) -> Result<Self, ClientError> {
        #[cfg(not(target_arch = "wasm32"))]
        let client = {
            let mut builder = ClientBuilder::new().user_agent(user_agent);
            if let Some(timeout) = timeout {
                builder = builder.timeout(timeout);
            }
            builder.build()?
        };

        #[cfg(target_arch = "wasm32")]
        let client = {
            let _ = timeout; // Timeouts not supported on WASM
            ClientBuilder::new().user_agent(user_agent).build()?
        };

        Ok(Self { client })
    }
}

#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
impl Transport for ReqwestTransport {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, ClientError> {
        let mut builder = self
            .client
            .request(request.method().clone(), request.url())
            .headers(request.headers().clone());

        if !request.query_pairs().is_empty() {
            builder = builder.query(request.query_pairs());
        }
        if let Some(body) = request.body_bytes() {
            builder = builder.body(body.clone());
        }

        let response = builder.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?;

        Ok(ApiResponse::new(status, headers, body))
    }
}
