//! Team API client methods

use super::{ApiClient, ClientError};
use crate::types::{AcceptInviteRequest, LoginResponse};
use reqwest::Method;

impl ApiClient {
    /// Accept a team invitation
    ///
    /// When the server answers with tokens (a newly created account), they
    /// are stored and the invitee is logged in.
    pub async fn accept_invite(
        &self,
        request: AcceptInviteRequest,
    ) -> Result<LoginResponse, ClientError> {
        let req = self
            .request(Method::POST, "/team/invite/accept")
            .without_session()
            .json(&request)?;
        let response: LoginResponse = self.execute(req).await?;

        if response.access_token.is_some() {
            self.session().establish(response.tokens());
            tracing::info!("Invitation accepted; session established");
        }

        Ok(response)
    }
}
