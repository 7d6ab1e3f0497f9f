//! Authentication API client methods

use super::{ApiClient, ClientError};
use crate::session::SessionEndReason;
use crate::types::{
    ForgotPasswordRequest, Id, LoginRequest, LoginResponse, LogoutRequest, MessageResponse,
    RegisterRequest, ResetPasswordRequest, SessionInfo, User,
};
use reqwest::Method;

impl ApiClient {
    /// Log in and store the returned tokens
    ///
    /// A 401 here means wrong credentials and is returned as
    /// `AuthenticationFailed` without touching the session.
    pub async fn login(
        &self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<LoginResponse, ClientError> {
        let req = self
            .request(Method::POST, "/auth/login")
            .without_session()
            .json(&LoginRequest {
                username: username.into(),
                password: password.into(),
            })?;
        let response: LoginResponse = self.execute(req).await?;

        if response.access_token.is_some() {
            self.session().establish(response.tokens());
            tracing::info!("Logged in");
        } else {
            tracing::warn!("Login response carried no access token");
        }

        Ok(response)
    }

    /// Create an account; the caller logs in separately
    pub async fn register(&self, request: RegisterRequest) -> Result<User, ClientError> {
        let req = self
            .request(Method::POST, "/auth/register")
            .without_session()
            .json(&request)?;
        self.execute(req).await
    }

    /// Revoke the stored refresh token on the server, then forget the tokens
    ///
    /// The server call is best effort: the local tokens are cleared whatever
    /// it returns.
    pub async fn logout(&self) {
        let session = self.session();
        session.tokens().load();

        if let Some(refresh_token) = session.tokens().refresh() {
            let result = match self
                .request(Method::POST, "/auth/logout")
                .without_session()
                .json(&LogoutRequest { refresh_token })
            {
                Ok(req) => self.execute_empty(req).await,
                Err(e) => Err(e),
            };
            if let Err(e) = result {
                tracing::warn!(error = %e, "Logout request failed");
            }
        }

        session.logout();
        tracing::info!("Logged out");
    }

    /// End every session of the current user, then forget the tokens
    pub async fn logout_all(&self) {
        let req = self.request(Method::POST, "/auth/logout-all").without_session();
        if let Err(e) = self.execute_empty(req).await {
            tracing::warn!(error = %e, "Logout-all request failed");
        }

        self.session().logout();
        tracing::info!("Logged out of all sessions");
    }

    /// Get the current user's profile
    pub async fn profile(&self) -> Result<User, ClientError> {
        let req = self.request(Method::GET, "/auth/profile");
        self.execute(req).await
    }

    /// List the current user's active sessions
    pub async fn sessions(&self) -> Result<Vec<SessionInfo>, ClientError> {
        let req = self.request(Method::GET, "/auth/sessions");
        self.execute(req).await
    }

    /// Revoke one of the current user's sessions
    pub async fn revoke_session(&self, session_id: &Id) -> Result<(), ClientError> {
        let req = self.request(Method::DELETE, &format!("/auth/sessions/{session_id}"));
        self.execute_empty(req).await
    }

    /// Ask for a password reset email
    pub async fn forgot_password(
        &self,
        email: impl Into<String>,
    ) -> Result<MessageResponse, ClientError> {
        let req = self
            .request(Method::POST, "/auth/forgot-password")
            .without_session()
            .json(&ForgotPasswordRequest {
                email: email.into(),
            })?;
        self.execute(req).await
    }

    /// Set a new password using the emailed reset token
    pub async fn reset_password(
        &self,
        token: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<MessageResponse, ClientError> {
        let req = self
            .request(Method::POST, "/auth/reset-password")
            .without_session()
            .json(&ResetPasswordRequest {
                token: token.into(),
                password: password.into(),
            })?;
        self.execute(req).await
    }

    /// Resume a persisted session at startup
    ///
    /// Returns `None` when no tokens are stored, or when the server no longer
    /// accepts them; in the latter case the session has ended.
    pub async fn restore_session(&self) -> Result<Option<User>, ClientError> {
        if !self.session().is_authenticated() {
            tracing::debug!("No stored session to restore");
            return Ok(None);
        }

        match self.profile().await {
            Ok(user) => {
                tracing::info!(user_id = %user.id, "Session restored");
                Ok(Some(user))
            }
            Err(e) if e.is_auth_expired() => {
                tracing::info!(error = %e, "Stored session rejected");
                self.session().end(SessionEndReason::SessionExpired);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}
