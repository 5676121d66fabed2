//! Error types for the directory client
//!
//! Three families:
//! - Validation failures the caller can fix (bad username, long domain)
//! - Conflicts with existing remote state (duplicate or active users)
//! - Remote/unknown failures, always carrying the offending payload
//!
//! "Not found" is never an error here; lookups return `Option`.

use sb_models::EntityKind;
use serde_json::Value;

/// Main directory error type
#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    /// Client constructed without a credential
    #[error("slack api token is required")]
    MissingToken,

    /// Username rejected by SCIM (invalid, too long or taken)
    #[error("bad username: {0}")]
    BadUsername(String),

    /// Workspace domain slug longer than Slack allows
    #[error("domain name '{domain}' is too long ({len} characters)")]
    DomainTooLong { domain: String, len: usize },

    /// Operation needs a remote id the record does not have yet
    #[error("{kind} '{name}' has no slack id")]
    MissingRemoteId { kind: EntityKind, name: String },

    /// User with this email is already present
    #[error("user already exists: {0}")]
    UserAlreadyExists(String),

    /// Search matched more than one account
    #[error("multiple users found with email {0}")]
    MultipleUsersWithSameEmail(String),

    /// Expected a deactivated user, found an active one
    #[error("user is active: {0}")]
    UserIsActive(String),

    /// Invite went through but the account cannot be found afterwards
    #[error("new user with email '{0}' is not found")]
    NewUserNotFound(String),

    /// SCIM user creation failed for a reason other than the username
    #[error("failed to create user (status {status}): {body}")]
    UserCreation { status: u16, body: Value },

    /// SCIM search returned a non-200 status
    #[error("failed to search users (status {status}): {body}")]
    SearchFailed { status: u16, body: Value },

    /// Web API answered `ok: false`
    #[error("slack api {method} failed: {error}")]
    Api {
        method: String,
        error: String,
        payload: Value,
    },

    /// SCIM update/patch returned a non-200 status
    #[error("scim {operation} failed (status {status}): {errors}")]
    Scim {
        operation: &'static str,
        status: u16,
        errors: Value,
    },

    /// Response did not have the expected shape
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    /// Network or HTTP client failure
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

impl DirectoryError {
    /// Caller-correctable input problem
    #[inline]
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::MissingToken
                | Self::BadUsername(_)
                | Self::DomainTooLong { .. }
                | Self::MissingRemoteId { .. }
        )
    }

    /// Precondition violated by existing remote state
    #[inline]
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            Self::UserAlreadyExists(_) | Self::MultipleUsersWithSameEmail(_) | Self::UserIsActive(_)
        )
    }

    /// Create missing-id error for an entity
    #[inline]
    pub fn missing_remote_id(kind: EntityKind, name: impl Into<String>) -> Self {
        Self::MissingRemoteId {
            kind,
            name: name.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn classification() {
        assert!(DirectoryError::BadUsername("username_taken".into()).is_validation());
        assert!(DirectoryError::DomainTooLong {
            domain: "x".into(),
            len: 30
        }
        .is_validation());
        assert!(DirectoryError::UserAlreadyExists("a@x.io".into()).is_conflict());
        assert!(DirectoryError::MultipleUsersWithSameEmail("a@x.io".into()).is_conflict());
        assert!(DirectoryError::UserIsActive("a@x.io".into()).is_conflict());

        let remote = DirectoryError::Api {
            method: "admin.teams.list".into(),
            error: "not_authed".into(),
            payload: json!({"ok": false}),
        };
        assert!(!remote.is_validation());
        assert!(!remote.is_conflict());
    }

    #[test]
    fn display_carries_context() {
        let err = DirectoryError::DomainTooLong {
            domain: "training-abcdefghijklmnop-misr".into(),
            len: 30,
        };
        assert_eq!(
            err.to_string(),
            "domain name 'training-abcdefghijklmnop-misr' is too long (30 characters)"
        );

        let missing = DirectoryError::missing_remote_id(EntityKind::Channel, "general");
        assert_eq!(missing.to_string(), "channel 'general' has no slack id");
    }
}
