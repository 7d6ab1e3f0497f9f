//! User directory API client methods

use super::{ApiClient, ClientError};
use crate::types::{Id, User};
use reqwest::Method;
use serde_json::Value as JsonValue;

/// Paging and search parameters for [`ApiClient::list_users`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub search: Option<String>,
}

impl ApiClient {
    /// List users (admin only)
    ///
    /// The listing envelope differs between deployments, so it is returned
    /// undecoded.
    pub async fn list_users(&self, query: &UserQuery) -> Result<JsonValue, ClientError> {
        let mut req = self.request(Method::GET, "/users");
        if let Some(page) = query.page {
            req = req.query("page", page.to_string());
        }
        if let Some(limit) = query.limit {
            req = req.query("limit", limit.to_string());
        }
        if let Some(search) = query.search.as_deref().filter(|s| !s.is_empty()) {
            req = req.query("search", search);
        }
        self.execute(req).await
    }

    /// Get a user by id
    pub async fn get_user(&self, user_id: &Id) -> Result<User, ClientError> {
        let req = self.request(Method::GET, &format!("/users/{user_id}"));
        self.execute(req).await
    }
}
