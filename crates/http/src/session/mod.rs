//! Per-application session state
//!
//! A [`Session`] owns everything the token lifecycle needs: the token store,
//! the refresh coordinator and the termination handler. Build one per
//! application session and share it with the [`ApiClient`](crate::client::ApiClient).

pub mod coordinator;
pub mod termination;

pub use coordinator::RefreshCoordinator;
pub use termination::{Notifier, SessionEndHook, SessionEndReason, SessionEnded, SessionTerminator};

use crate::client::error::RefreshError;
use kolabo_core::{ClientConfig, KeyValueStorage, TokenPair, TokenStore, jwt};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Token store, refresh coordination and termination for one session
#[derive(Debug)]
pub struct Session {
    tokens: TokenStore,
    coordinator: RefreshCoordinator,
    terminator: SessionTerminator,
}

impl Session {
    /// Assemble a session from its parts
    pub fn new(tokens: TokenStore, terminator: SessionTerminator) -> Self {
        Self {
            tokens,
            coordinator: RefreshCoordinator::new(),
            terminator,
        }
    }

    /// Start building a session persisted in `storage`
    pub fn builder(storage: Arc<dyn KeyValueStorage>) -> SessionBuilder {
        SessionBuilder::new(storage)
    }

    pub fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    /// Whether an access token is stored, after re-reading storage
    pub fn is_authenticated(&self) -> bool {
        self.tokens.load();
        self.tokens.access().is_some()
    }

    /// Whether a token refresh is in flight
    pub fn is_refreshing(&self) -> bool {
        self.coordinator.is_refreshing()
    }

    /// Number of callers queued behind the in-flight refresh
    pub fn refresh_waiters(&self) -> usize {
        self.coordinator.pending()
    }

    /// Whether this session has ended
    pub fn has_terminated(&self) -> bool {
        self.terminator.has_fired()
    }

    /// Store the token pair obtained from a login or invite acceptance
    pub fn establish(&self, tokens: TokenPair) -> TokenPair {
        tracing::debug!("Session tokens established");
        self.tokens.set(tokens)
    }

    /// Forget the tokens without signalling the end of the session
    pub fn logout(&self) {
        self.tokens.clear();
    }

    /// Clear the tokens and fire the session-ended signal (once)
    pub fn end(&self, reason: SessionEndReason) -> bool {
        self.tokens.clear();
        self.terminator.terminate(reason)
    }

    /// Time left on the stored access token, if it is a JWT with an expiry
    pub fn access_time_remaining(&self) -> Option<Duration> {
        let token = self.tokens.access()?;
        jwt::expires_at(&token)?;
        Some(jwt::time_remaining(&token))
    }

    /// Obtain a fresh access token, sharing an in-flight refresh if one exists
    ///
    /// `exchange` trades the stored refresh token for a new pair; it only
    /// runs for the caller that leads a refresh. On success the pair is
    /// merged into the store before any queued caller is released. On failure
    /// the session ends and every caller receives the same error.
    ///
    /// A refresh whose leader was dropped before settling is not a failure:
    /// queued callers start a new one, and the session stays alive.
    ///
    /// # Errors
    ///
    /// Returns the refresh failure shared by all callers of this round
    pub async fn refresh_access<F, Fut>(&self, exchange: F) -> Result<String, RefreshError>
    where
        F: Fn(String) -> Fut,
        Fut: Future<Output = Result<TokenPair, RefreshError>>,
    {
        loop {
            let mut led = false;
            let outcome = self
                .coordinator
                .run(|| {
                    led = true;
                    self.lead_refresh(&exchange)
                })
                .await;

            match &outcome {
                Err(RefreshError::Abandoned) if !led => {
                    tracing::debug!("Refresh leader went away; retrying");
                }
                Err(RefreshError::Abandoned) | Ok(_) => return outcome,
                Err(e) => {
                    tracing::warn!(error = %e, "Token refresh failed; ending session");
                    let reason = match e {
                        RefreshError::NoRefreshToken => SessionEndReason::NotAuthenticated,
                        _ => SessionEndReason::SessionExpired,
                    };
                    self.end(reason);
                    return outcome;
                }
            }
        }
    }

    async fn lead_refresh<F, Fut>(&self, exchange: &F) -> Result<String, RefreshError>
    where
        F: Fn(String) -> Fut,
        Fut: Future<Output = Result<TokenPair, RefreshError>>,
    {
        self.tokens.load();
        let refresh_token = self.tokens.refresh().ok_or(RefreshError::NoRefreshToken)?;

        let pair = exchange(refresh_token).await?;
        let access = pair
            .access_token
            .clone()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| RefreshError::InvalidResponse("missing access_token".to_string()))?;

        self.tokens.set(pair);
        tracing::info!("Access token refreshed");
        Ok(access)
    }
}

/// Builder for [`Session`]
pub struct SessionBuilder {
    storage: Arc<dyn KeyValueStorage>,
    config: ClientConfig,
    notifier: Option<Arc<dyn Notifier>>,
    hook: Option<Arc<dyn SessionEndHook>>,
}

impl SessionBuilder {
    fn new(storage: Arc<dyn KeyValueStorage>) -> Self {
        Self {
            storage,
            config: ClientConfig::default(),
            notifier: None,
            hook: None,
        }
    }

    /// Take storage key, login route and redirect delay from `config`
    pub fn config(mut self, config: &ClientConfig) -> Self {
        self.config = config.clone();
        self
    }

    /// User-facing notifier for the session-ended message
    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Callback fired once when the session ends
    pub fn on_session_end(mut self, hook: Arc<dyn SessionEndHook>) -> Self {
        self.hook = Some(hook);
        self
    }

    /// Build the session and load any persisted tokens
    pub fn build(self) -> Session {
        let tokens = TokenStore::new(self.storage, self.config.storage_key.clone())
            .with_legacy_keys(self.config.mirror_legacy_keys);
        tokens.load();

        let mut terminator =
            SessionTerminator::new(self.config.login_route.clone(), self.config.redirect_delay());
        if let Some(notifier) = self.notifier {
            terminator = terminator.with_notifier(notifier);
        }
        if let Some(hook) = self.hook {
            terminator = terminator.with_hook(hook);
        }

        Session::new(tokens, terminator)
    }
}
