//! Remote API seams
//!
//! The client never talks HTTP directly. It goes through these two traits so
//! batches can run against in-memory fakes in tests.

use crate::error::DirectoryError;
use crate::scim::{ScimResponse, ScimUser};
use serde_json::Value;

/// Slack Web API (admin and conversation methods)
#[async_trait::async_trait]
pub trait AdminApi: Send + Sync {
    /// Invoke `method` with flat parameters and return the decoded body
    ///
    /// Implementations return the body as-is; `ok: false` is interpreted by
    /// the caller.
    async fn call(&self, method: &str, params: Value) -> Result<Value, DirectoryError>;
}

/// SCIM v1 user provisioning API
#[async_trait::async_trait]
pub trait ScimApi: Send + Sync {
    /// `GET /Users?filter=...`
    async fn search_users(
        &self,
        filter: &str,
        count: u32,
        start_index: u32,
    ) -> Result<ScimResponse, DirectoryError>;

    /// `POST /Users`
    async fn create_user(&self, user: &ScimUser) -> Result<ScimResponse, DirectoryError>;

    /// `PUT /Users/{id}`
    async fn update_user(&self, user: &ScimUser) -> Result<ScimResponse, DirectoryError>;

    /// `PATCH /Users/{id}`
    async fn patch_user(&self, id: &str, partial: Value) -> Result<ScimResponse, DirectoryError>;
}
