//! Slack directory client
//!
//! Owns the two remote seams and the cooldown table. Every remote call goes
//! through [`Debouncer::wait_for`] first, keyed by the logical operation.
//!
//! Errors are never swallowed here. The only recovery the client performs on
//! its own is a single retry of user creation with the email local part when
//! SCIM rejects the username.

use crate::debounce::{ApiOperation, Debouncer};
use crate::error::DirectoryError;
use crate::http::{HttpAdminApi, HttpScimApi, DEFAULT_SCIM_BASE, DEFAULT_WEB_API_BASE};
use crate::scim::{DirectoryUser, ScimUser};
use crate::transport::{AdminApi, ScimApi};
use sb_models::{Channel, EntityKind, User, Workspace};
use serde_json::{json, Map, Value};
use std::sync::Arc;

/// Longest domain slug Slack accepts
pub const MAX_DOMAIN_LEN: usize = 21;

/// Page size for `users.list`
pub const USERS_LIST_PAGE_SIZE: u32 = 150;

const BAD_USERNAME_ERRORS: [&str; 3] = ["username_invalid", "username_too_long", "username_taken"];

/// How an ambiguous email search is reported by
/// [`DirectoryClient::verify_user_not_exists_in_slack`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MultipleMatchPolicy {
    /// Several matches count as "already exists"
    #[default]
    TreatAsExisting,
    /// Surface `MultipleUsersWithSameEmail` unchanged
    Propagate,
}

/// Client configuration
#[derive(Debug, Clone)]
pub struct DirectoryConfig {
    /// Web API base URL
    pub web_api_base: String,
    /// SCIM base URL
    pub scim_base: String,
    /// Log debounce waits at info level
    pub log_debouncing: bool,
    /// Suffix appended to workspace domains
    pub domain_suffix: String,
    /// Ambiguous-search handling in existence checks
    pub multiple_match_policy: MultipleMatchPolicy,
}

impl DirectoryConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With debounce logging
    #[inline]
    #[must_use]
    pub fn with_log_debouncing(mut self, enabled: bool) -> Self {
        self.log_debouncing = enabled;
        self
    }

    /// With workspace domain suffix
    #[inline]
    #[must_use]
    pub fn with_domain_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.domain_suffix = suffix.into();
        self
    }

    /// With multiple-match policy
    #[inline]
    #[must_use]
    pub fn with_multiple_match_policy(mut self, policy: MultipleMatchPolicy) -> Self {
        self.multiple_match_policy = policy;
        self
    }
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            web_api_base: DEFAULT_WEB_API_BASE.to_string(),
            scim_base: DEFAULT_SCIM_BASE.to_string(),
            log_debouncing: false,
            domain_suffix: "misr".to_string(),
            multiple_match_policy: MultipleMatchPolicy::default(),
        }
    }
}

/// Rate-limit aware wrapper around the Slack admin and SCIM APIs
pub struct DirectoryClient {
    admin: Arc<dyn AdminApi>,
    scim: Arc<dyn ScimApi>,
    debouncer: Debouncer,
    config: DirectoryConfig,
}

impl std::fmt::Debug for DirectoryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectoryClient")
            .field("debouncer", &self.debouncer)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl DirectoryClient {
    /// Connect to Slack over HTTPS with `token`
    ///
    /// # Errors
    /// - `DirectoryError::MissingToken` if `token` is empty
    /// - `DirectoryError::Transport` if the HTTP client cannot be built
    pub fn connect(token: &str, config: DirectoryConfig) -> Result<Self, DirectoryError> {
        if token.trim().is_empty() {
            return Err(DirectoryError::MissingToken);
        }
        let admin = HttpAdminApi::new(config.web_api_base.clone(), token)?;
        let scim = HttpScimApi::new(config.scim_base.clone(), token)?;
        Ok(Self::with_transports(Arc::new(admin), Arc::new(scim), config))
    }

    /// Build on caller-provided transports
    #[must_use]
    pub fn with_transports(
        admin: Arc<dyn AdminApi>,
        scim: Arc<dyn ScimApi>,
        config: DirectoryConfig,
    ) -> Self {
        Self {
            admin,
            scim,
            debouncer: Debouncer::new().with_wait_logging(config.log_debouncing),
            config,
        }
    }

    /// Cooldown table
    #[inline]
    #[must_use]
    pub fn debouncer(&self) -> &Debouncer {
        &self.debouncer
    }

    /// Active configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &DirectoryConfig {
        &self.config
    }

    fn log_creation(kind: EntityKind, designator: &str, id: &str) {
        tracing::info!("Created {kind} in slack for {designator} with id {id}");
    }

    /// Debounced Web API call that fails on `ok: false`
    async fn admin_call(
        &self,
        operation: ApiOperation,
        method: &str,
        params: Value,
    ) -> Result<Value, DirectoryError> {
        self.debouncer.wait_for(operation).await;
        let body = self.admin.call(method, params).await?;

        if body.get("ok").and_then(Value::as_bool) == Some(true) {
            Ok(body)
        } else {
            let error = body
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("unknown_error")
                .to_string();
            Err(DirectoryError::Api {
                method: method.to_string(),
                error,
                payload: body,
            })
        }
    }

    /// Debounced SCIM patch that fails on anything but 200
    async fn patch(
        &self,
        operation: ApiOperation,
        user_id: &str,
        partial: Value,
    ) -> Result<(), DirectoryError> {
        self.debouncer.wait_for(operation).await;
        let response = self.scim.patch_user(user_id, partial).await?;

        if response.status == 200 {
            Ok(())
        } else {
            Err(DirectoryError::Scim {
                operation: operation.key(),
                status: response.status,
                errors: response.errors(),
            })
        }
    }

    // ------------------------------------------------------------------
    // Users (SCIM)
    // ------------------------------------------------------------------

    /// Find the single account registered under `email`
    ///
    /// # Errors
    /// - `DirectoryError::MultipleUsersWithSameEmail` for more than one match
    /// - `DirectoryError::SearchFailed` if SCIM answers with a non-200 status
    pub async fn search_user(&self, email: &str) -> Result<Option<DirectoryUser>, DirectoryError> {
        self.debouncer.wait_for(ApiOperation::ScimSearchUsers).await;

        let filter = format!("email eq {email}");
        let response = self.scim.search_users(&filter, 10, 0).await?;
        if response.status != 200 {
            return Err(DirectoryError::SearchFailed {
                status: response.status,
                body: response.body,
            });
        }

        let resources = match response.body.get("Resources").and_then(Value::as_array) {
            Some(resources) if !resources.is_empty() => resources,
            _ => return Ok(None),
        };

        if resources.len() > 1 {
            return Err(DirectoryError::MultipleUsersWithSameEmail(email.to_string()));
        }

        serde_json::from_value(resources[0].clone())
            .map(Some)
            .map_err(|e| DirectoryError::UnexpectedResponse(format!("scim user record: {e}")))
    }

    async fn create_slack_user(&self, scim_user: &ScimUser) -> Result<String, DirectoryError> {
        self.debouncer.wait_for(ApiOperation::CreateUser).await;
        let response = self.scim.create_user(scim_user).await?;

        match response.status {
            201 => response
                .body
                .get("id")
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| {
                    DirectoryError::UnexpectedResponse("created user has no id".to_string())
                }),
            400 | 409 => {
                let description = response.error_description().unwrap_or_default();
                let error_type = description.split(' ').next().unwrap_or_default();
                if BAD_USERNAME_ERRORS.contains(&error_type) {
                    Err(DirectoryError::BadUsername(description.to_string()))
                } else {
                    Err(DirectoryError::UserCreation {
                        status: response.status,
                        body: response.body,
                    })
                }
            }
            status => Err(DirectoryError::UserCreation {
                status,
                body: response.body,
            }),
        }
    }

    /// Provision `user` and return its new remote id
    ///
    /// A rejected username is retried once with the email local part.
    ///
    /// # Errors
    /// - `DirectoryError::BadUsername` if the fallback username is rejected too
    /// - `DirectoryError::UserCreation` for any other SCIM rejection
    pub async fn upload_new_single_user(&self, user: &User) -> Result<String, DirectoryError> {
        let scim_user = ScimUser::for_user(user, &user.name);

        let created = match self.create_slack_user(&scim_user).await {
            Ok(id) => Ok(id),
            Err(DirectoryError::BadUsername(_)) => {
                let short_username = user.email_local_part();
                tracing::warn!(
                    "Full name is too long for user {}. Using short name '{short_username}'.",
                    user.email
                );
                let fallback = ScimUser::for_user(user, short_username);
                self.create_slack_user(&fallback).await
            }
            Err(e) => Err(e),
        };

        match created {
            Ok(id) => {
                tracing::info!("User {} created successfully. Slack ID: {id}", user.email);
                Ok(id)
            }
            Err(e) => {
                tracing::error!("Failed to create user {}: {e}", user.email);
                Err(e)
            }
        }
    }

    /// Fail if an account with `email` already exists
    ///
    /// Under [`MultipleMatchPolicy::TreatAsExisting`] an ambiguous search is
    /// reported as `UserAlreadyExists` too.
    ///
    /// # Errors
    /// - `DirectoryError::UserAlreadyExists`
    /// - Search errors
    pub async fn verify_user_not_exists_in_slack(&self, email: &str) -> Result<(), DirectoryError> {
        match self.search_user(email).await {
            Ok(None) => Ok(()),
            Ok(Some(_)) => Err(DirectoryError::UserAlreadyExists(email.to_string())),
            Err(DirectoryError::MultipleUsersWithSameEmail(found))
                if self.config.multiple_match_policy == MultipleMatchPolicy::TreatAsExisting =>
            {
                Err(DirectoryError::UserAlreadyExists(found))
            }
            Err(e) => Err(e),
        }
    }

    /// Id of the deactivated account under `email`, if any
    ///
    /// # Errors
    /// - `DirectoryError::UserIsActive` if the match is still active
    /// - Search errors
    pub async fn verify_deactivated_user_email(
        &self,
        email: &str,
    ) -> Result<Option<String>, DirectoryError> {
        match self.search_user(email).await? {
            Some(user) if user.active => Err(DirectoryError::UserIsActive(email.to_string())),
            Some(user) => Ok(Some(user.id)),
            None => Ok(None),
        }
    }

    /// Deactivate `user`; Slack drops them from every workspace and channel
    ///
    /// # Errors
    /// - `DirectoryError::MissingRemoteId` if `user` has no slack id
    /// - `DirectoryError::Scim` on a non-200 answer
    pub async fn deactivate_user(&self, user: &User) -> Result<(), DirectoryError> {
        let user_id = user
            .slack_id
            .as_deref()
            .ok_or_else(|| DirectoryError::missing_remote_id(EntityKind::User, &user.email))?;
        self.patch(
            ApiOperation::AdminUsersDelete,
            user_id,
            json!({"active": false}),
        )
        .await
    }

    /// Replace a full SCIM user record
    ///
    /// # Errors
    /// - `DirectoryError::Scim` on a non-200 answer
    pub async fn update_user(&self, user: &ScimUser) -> Result<(), DirectoryError> {
        self.debouncer.wait_for(ApiOperation::UpdateUser).await;
        let response = self.scim.update_user(user).await?;

        if response.status == 200 {
            Ok(())
        } else {
            Err(DirectoryError::Scim {
                operation: ApiOperation::UpdateUser.key(),
                status: response.status,
                errors: response.errors(),
            })
        }
    }

    /// Set `new_email` as the primary email
    ///
    /// # Errors
    /// - `DirectoryError::Scim` on a non-200 answer
    pub async fn change_user_email(&self, user_id: &str, new_email: &str) -> Result<(), DirectoryError> {
        self.patch(
            ApiOperation::PatchUser,
            user_id,
            json!({"emails": [{"value": new_email, "primary": true}]}),
        )
        .await
    }

    /// Point the user's avatar at `photo_url`
    ///
    /// # Errors
    /// - `DirectoryError::Scim` on a non-200 answer
    pub async fn update_photo(&self, user_id: &str, photo_url: &str) -> Result<(), DirectoryError> {
        self.patch(
            ApiOperation::PatchUser,
            user_id,
            json!({"photos": [photo_url]}),
        )
        .await
    }

    /// Re-enable a deactivated account
    ///
    /// # Errors
    /// - `DirectoryError::Scim` on a non-200 answer
    pub async fn activate_user(&self, user_id: &str) -> Result<(), DirectoryError> {
        self.patch(ApiOperation::PatchUser, user_id, json!({"active": true}))
            .await
    }

    // ------------------------------------------------------------------
    // Workspaces
    // ------------------------------------------------------------------

    /// Id of the workspace named like `workspace`, if it exists
    ///
    /// # Errors
    /// - `DirectoryError::Api` if listing teams fails
    pub async fn verify_workspace_exists_in_slack(
        &self,
        workspace: &Workspace,
    ) -> Result<Option<String>, DirectoryError> {
        let body = self
            .admin_call(ApiOperation::AdminTeamsList, "admin.teams.list", json!({}))
            .await?;

        let id = body
            .get("teams")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .find(|team| team.get("name").and_then(Value::as_str) == Some(workspace.name.as_str()))
            .and_then(|team| team.get("id").and_then(Value::as_str))
            .map(str::to_string);
        Ok(id)
    }

    /// Create `workspace` unless one with the same name exists
    ///
    /// # Errors
    /// - `DirectoryError::DomainTooLong` before any creation attempt
    /// - `DirectoryError::Api` if listing or creating fails
    pub async fn create_workspace_in_slack(
        &self,
        workspace: &Workspace,
    ) -> Result<String, DirectoryError> {
        if let Some(existing) = self.verify_workspace_exists_in_slack(workspace).await? {
            tracing::info!(
                "Workspace {} already exists in Slack, slack_id={existing}",
                workspace.name
            );
            return Ok(existing);
        }

        let domain = workspace.domain_slug(&self.config.domain_suffix);
        if domain.len() > MAX_DOMAIN_LEN {
            return Err(DirectoryError::DomainTooLong {
                len: domain.len(),
                domain,
            });
        }

        let body = self
            .admin_call(
                ApiOperation::AdminTeamsCreate,
                "admin.teams.create",
                json!({"team_name": workspace.name, "team_domain": domain}),
            )
            .await?;

        let id = body
            .get("team")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| DirectoryError::UnexpectedResponse("team id missing".to_string()))?;

        Self::log_creation(workspace.kind(), &workspace.name, &id);
        Ok(id)
    }

    /// Every member of `workspace`, following pagination cursors
    ///
    /// # Errors
    /// - `DirectoryError::MissingRemoteId` if `workspace` has no slack id
    /// - `DirectoryError::Api` if any page fails
    pub async fn get_users_of_workspace(
        &self,
        workspace: &Workspace,
    ) -> Result<Vec<Value>, DirectoryError> {
        let team_id = remote_id(workspace.slack_id.as_deref(), EntityKind::Workspace, &workspace.name)?;

        let mut members = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let mut params = Map::new();
            params.insert("team_id".into(), json!(team_id));
            params.insert("limit".into(), json!(USERS_LIST_PAGE_SIZE));
            if let Some(cursor) = &cursor {
                params.insert("cursor".into(), json!(cursor));
            }

            let body = self
                .admin_call(ApiOperation::UsersList, "users.list", Value::Object(params))
                .await?;

            if let Some(page) = body.get("members").and_then(Value::as_array) {
                members.extend(page.iter().cloned());
            }

            cursor = body
                .get("response_metadata")
                .and_then(|meta| meta.get("next_cursor"))
                .and_then(Value::as_str)
                .filter(|next| !next.is_empty())
                .map(str::to_string);

            if cursor.is_none() {
                return Ok(members);
            }
        }
    }

    /// Remove `user` from `workspace`
    ///
    /// # Errors
    /// - `DirectoryError::MissingRemoteId` if either record lacks a slack id
    /// - `DirectoryError::Api` on failure
    pub async fn remove_user_from_workspace(
        &self,
        user: &User,
        workspace: &Workspace,
    ) -> Result<(), DirectoryError> {
        let team_id = remote_id(workspace.slack_id.as_deref(), EntityKind::Workspace, &workspace.name)?;
        let user_id = remote_id(user.slack_id.as_deref(), EntityKind::User, &user.email)?;

        self.admin_call(
            ApiOperation::AdminUsersRemove,
            "admin.users.remove",
            json!({"team_id": team_id, "user_id": user_id}),
        )
        .await
        .map(drop)
    }

    /// Add a user to a workspace and its channels
    ///
    /// This activates the user and sends them a welcome message.
    ///
    /// # Errors
    /// - `DirectoryError::Api` on failure
    pub async fn add_user_to_workspace_by_ids(
        &self,
        user_id: &str,
        workspace_id: &str,
        channel_ids: &[String],
    ) -> Result<(), DirectoryError> {
        let mut params = Map::new();
        params.insert("team_id".into(), json!(workspace_id));
        params.insert("user_id".into(), json!(user_id));
        insert_channel_ids(&mut params, channel_ids);

        self.admin_call(
            ApiOperation::AdminUsersAssign,
            "admin.users.assign",
            Value::Object(params),
        )
        .await
        .map(drop)
    }

    /// Grant workspace admin
    ///
    /// # Errors
    /// - `DirectoryError::Api` on failure
    pub async fn make_user_admin(&self, user_id: &str, workspace_id: &str) -> Result<(), DirectoryError> {
        self.admin_call(
            ApiOperation::AdminUsersSetAdmin,
            "admin.users.setAdmin",
            json!({"team_id": workspace_id, "user_id": user_id}),
        )
        .await
        .map(drop)
    }

    /// Grant workspace owner
    ///
    /// # Errors
    /// - `DirectoryError::Api` on failure
    pub async fn make_user_owner(&self, user_id: &str, workspace_id: &str) -> Result<(), DirectoryError> {
        self.admin_call(
            ApiOperation::AdminUsersSetOwner,
            "admin.users.setOwner",
            json!({"team_id": workspace_id, "user_id": user_id}),
        )
        .await
        .map(drop)
    }

    /// Invite `email` into a workspace and return the new account's id
    ///
    /// # Errors
    /// - `DirectoryError::Api` if the invite fails
    /// - `DirectoryError::NewUserNotFound` if the account cannot be found afterwards
    pub async fn invite_new_user_to_workspace(
        &self,
        email: &str,
        team_id: &str,
        channel_ids: &[String],
        email_password_policy_enabled: bool,
        resend_invitation_enabled: bool,
    ) -> Result<String, DirectoryError> {
        let mut params = Map::new();
        params.insert("team_id".into(), json!(team_id));
        params.insert("email".into(), json!(email));
        insert_channel_ids(&mut params, channel_ids);
        params.insert(
            "email_password_policy_enabled".into(),
            json!(email_password_policy_enabled),
        );
        params.insert("resend".into(), json!(resend_invitation_enabled));

        self.admin_call(
            ApiOperation::AdminUsersInvite,
            "admin.users.invite",
            Value::Object(params),
        )
        .await?;

        self.search_user(email)
            .await?
            .map(|user| user.id)
            .ok_or_else(|| DirectoryError::NewUserNotFound(email.to_string()))
    }

    // ------------------------------------------------------------------
    // Channels
    // ------------------------------------------------------------------

    /// Create `channel` as a public channel of `workspace`
    ///
    /// A channel that already carries a slack id is returned unchanged.
    ///
    /// # Errors
    /// - `DirectoryError::MissingRemoteId` if `workspace` has no slack id
    /// - `DirectoryError::Api` on failure
    pub async fn create_channel_in_slack(
        &self,
        channel: &Channel,
        workspace: &Workspace,
    ) -> Result<String, DirectoryError> {
        if let Some(id) = &channel.slack_id {
            tracing::info!("Channel {} already has a Slack ID.", channel.name);
            return Ok(id.clone());
        }

        let team_id = remote_id(workspace.slack_id.as_deref(), EntityKind::Workspace, &workspace.name)?;

        let mut params = Map::new();
        params.insert("name".into(), json!(channel.prepared_name()));
        params.insert("team_id".into(), json!(team_id));
        params.insert("is_private".into(), json!(false));
        if let Some(description) = &channel.description {
            params.insert("description".into(), json!(description));
        }

        let body = self
            .admin_call(
                ApiOperation::ConversationsCreate,
                "conversations.create",
                Value::Object(params),
            )
            .await?;

        let id = body
            .get("channel")
            .and_then(|c| c.get("id"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| DirectoryError::UnexpectedResponse("channel id missing".to_string()))?;

        Self::log_creation(channel.kind(), &channel.name, &id);
        Ok(id)
    }

    /// Share `channel` from `main_workspace` into `additional_workspaces`
    ///
    /// # Errors
    /// - `DirectoryError::MissingRemoteId` if any record lacks a slack id
    /// - `DirectoryError::Api` on failure
    pub async fn link_channel_to_additional_workspace(
        &self,
        channel: &Channel,
        additional_workspaces: &[Workspace],
        main_workspace: &Workspace,
    ) -> Result<(), DirectoryError> {
        let channel_id = remote_id(channel.slack_id.as_deref(), EntityKind::Channel, &channel.name)?;
        let team_id = remote_id(
            main_workspace.slack_id.as_deref(),
            EntityKind::Workspace,
            &main_workspace.name,
        )?;
        let target_team_ids = additional_workspaces
            .iter()
            .map(|w| remote_id(w.slack_id.as_deref(), EntityKind::Workspace, &w.name))
            .collect::<Result<Vec<_>, _>>()?
            .join(",");

        self.admin_call(
            ApiOperation::SetTeams,
            "admin.conversations.setTeams",
            json!({
                "channel_id": channel_id,
                "target_team_ids": target_team_ids,
                "team_id": team_id,
            }),
        )
        .await
        .map(drop)
    }

    /// Invite a user into a channel of a workspace they already belong to
    ///
    /// # Errors
    /// - `DirectoryError::Api` on failure
    pub async fn invite_user_to_channel_of_same_workspace(
        &self,
        user_id: &str,
        channel_id: &str,
    ) -> Result<(), DirectoryError> {
        self.admin_call(
            ApiOperation::AdminConversationsInvite,
            "admin.conversations.invite",
            json!({"user_ids": user_id, "channel_id": channel_id}),
        )
        .await
        .map(drop)
    }

    /// Convert a public channel to private
    ///
    /// # Errors
    /// - `DirectoryError::MissingRemoteId` if `channel` has no slack id
    /// - `DirectoryError::Api` on failure
    pub async fn make_channel_private(&self, channel: &Channel) -> Result<(), DirectoryError> {
        let channel_id = remote_id(channel.slack_id.as_deref(), EntityKind::Channel, &channel.name)?;
        self.admin_call(
            ApiOperation::AdminConversationsConvertToPrivate,
            "admin.conversations.convertToPrivate",
            json!({"channel_id": channel_id}),
        )
        .await
        .map(drop)
    }
}

/// Channel lists travel comma-joined; an empty list is left out
fn insert_channel_ids(params: &mut Map<String, Value>, channel_ids: &[String]) {
    if !channel_ids.is_empty() {
        params.insert("channel_ids".into(), json!(channel_ids.join(",")));
    }
}

fn remote_id<'a>(
    slack_id: Option<&'a str>,
    kind: EntityKind,
    name: &str,
) -> Result<&'a str, DirectoryError> {
    slack_id.ok_or_else(|| DirectoryError::missing_remote_id(kind, name))
}
