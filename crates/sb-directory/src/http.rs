//! `reqwest` implementations of the remote API seams

use crate::error::DirectoryError;
use crate::scim::{ScimResponse, ScimUser};
use crate::transport::{AdminApi, ScimApi};
use reqwest::{Client, Response};
use sb_models::EntityKind;
use serde_json::Value;
use std::time::Duration;

/// Default Web API endpoint
pub const DEFAULT_WEB_API_BASE: &str = "https://slack.com/api";
/// Default SCIM endpoint
pub const DEFAULT_SCIM_BASE: &str = "https://api.slack.com/scim/v1";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

fn build_client(token: &str) -> Result<Client, DirectoryError> {
    if token.trim().is_empty() {
        return Err(DirectoryError::MissingToken);
    }
    Ok(Client::builder().timeout(REQUEST_TIMEOUT).build()?)
}

/// Web API over HTTPS
#[derive(Debug, Clone)]
pub struct HttpAdminApi {
    client: Client,
    base_url: String,
    token: String,
}

impl HttpAdminApi {
    /// Create client for `base_url`
    ///
    /// # Errors
    /// - `DirectoryError::MissingToken` if `token` is empty
    /// - `DirectoryError::Transport` if the HTTP client cannot be built
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Result<Self, DirectoryError> {
        let token = token.into();
        let client = build_client(&token)?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
        })
    }
}

#[async_trait::async_trait]
impl AdminApi for HttpAdminApi {
    async fn call(&self, method: &str, params: Value) -> Result<Value, DirectoryError> {
        let url = format!("{}/{method}", self.base_url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .form(&params)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            Ok(response.json().await?)
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(DirectoryError::UnexpectedResponse(format!(
                "{method} returned HTTP {status}: {body}"
            )))
        }
    }
}

/// SCIM over HTTPS
#[derive(Debug, Clone)]
pub struct HttpScimApi {
    client: Client,
    base_url: String,
    token: String,
}

impl HttpScimApi {
    /// Create client for `base_url`
    ///
    /// # Errors
    /// - `DirectoryError::MissingToken` if `token` is empty
    /// - `DirectoryError::Transport` if the HTTP client cannot be built
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Result<Self, DirectoryError> {
        let token = token.into();
        let client = build_client(&token)?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
        })
    }

    fn user_url(&self, id: &str) -> String {
        format!("{}/Users/{id}", self.base_url)
    }
}

async fn into_scim_response(response: Response) -> Result<ScimResponse, DirectoryError> {
    let status = response.status().as_u16();
    let text = response.text().await?;
    let body = if text.trim().is_empty() {
        Value::Null
    } else {
        serde_json::from_str(&text).unwrap_or(Value::String(text))
    };
    Ok(ScimResponse::new(status, body))
}

#[async_trait::async_trait]
impl ScimApi for HttpScimApi {
    async fn search_users(
        &self,
        filter: &str,
        count: u32,
        start_index: u32,
    ) -> Result<ScimResponse, DirectoryError> {
        let response = self
            .client
            .get(format!("{}/Users", self.base_url))
            .bearer_auth(&self.token)
            .query(&[
                ("filter", filter.to_string()),
                ("count", count.to_string()),
                ("startIndex", start_index.to_string()),
            ])
            .send()
            .await?;
        into_scim_response(response).await
    }

    async fn create_user(&self, user: &ScimUser) -> Result<ScimResponse, DirectoryError> {
        let response = self
            .client
            .post(format!("{}/Users", self.base_url))
            .bearer_auth(&self.token)
            .json(user)
            .send()
            .await?;
        into_scim_response(response).await
    }

    async fn update_user(&self, user: &ScimUser) -> Result<ScimResponse, DirectoryError> {
        let id = user
            .id
            .as_deref()
            .ok_or_else(|| DirectoryError::missing_remote_id(EntityKind::User, &user.user_name))?;
        let response = self
            .client
            .put(self.user_url(id))
            .bearer_auth(&self.token)
            .json(user)
            .send()
            .await?;
        into_scim_response(response).await
    }

    async fn patch_user(&self, id: &str, partial: Value) -> Result<ScimResponse, DirectoryError> {
        let response = self
            .client
            .patch(self.user_url(id))
            .bearer_auth(&self.token)
            .json(&partial)
            .send()
            .await?;
        into_scim_response(response).await
    }
}
