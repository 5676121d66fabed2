//! Typed instruction entries
//!
//! One struct per batch kind. Every struct rejects unknown columns, so a CSV
//! header that does not match the shape fails on the first row instead of
//! being silently ignored.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Batch kind an instruction entry belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstructionKind {
    /// Add existing user to a workspace and channel
    AddToChannel,
    /// Promote user to workspace admin or owner
    AssignRole,
    /// Deactivate user (removes them everywhere)
    DeactivateRemove,
    /// Invite a brand new user
    InviteNewUser,
    /// Replace a user's primary email
    ChangeEmail,
    /// Generic single-email row
    SingleEmail,
    /// Set a user's profile photo
    AssignPhoto,
}

impl InstructionKind {
    /// Stable name used in logs and errors
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AddToChannel => "add_to_channel",
            Self::AssignRole => "assign_role",
            Self::DeactivateRemove => "deactivate_remove",
            Self::InviteNewUser => "invite_new_user",
            Self::ChangeEmail => "change_email",
            Self::SingleEmail => "single_email",
            Self::AssignPhoto => "assign_photo",
        }
    }
}

impl fmt::Display for InstructionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Common surface of all instruction shapes
pub trait InstructionEntry: Serialize + for<'de> Deserialize<'de> + Clone + fmt::Debug {
    /// Which batch this shape belongs to
    const KIND: InstructionKind;

    /// CSV header, in column order
    const FIELDS: &'static [&'static str];
}

/// Workspace role that can be granted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkspaceRole {
    /// Workspace admin
    Admin,
    /// Workspace owner
    Owner,
}

impl fmt::Display for WorkspaceRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Admin => f.write_str("admin"),
            Self::Owner => f.write_str("owner"),
        }
    }
}

/// Add an existing user to a workspace channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AddUserInstructionEntry {
    pub workspace_name: String,
    pub workspace_slack_id: String,
    pub channel_name: String,
    pub channel_slack_id: String,
    pub user_email: String,
    pub user_slack_id: String,
}

impl InstructionEntry for AddUserInstructionEntry {
    const KIND: InstructionKind = InstructionKind::AddToChannel;
    const FIELDS: &'static [&'static str] = &[
        "workspace_name",
        "workspace_slack_id",
        "channel_name",
        "channel_slack_id",
        "user_email",
        "user_slack_id",
    ];
}

/// Grant admin or owner on a workspace
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AssignAdminOwnerInstructionEntry {
    pub workspace_name: String,
    pub workspace_slack_id: String,
    pub user_email: String,
    pub user_slack_id: String,
    pub role: WorkspaceRole,
}

impl InstructionEntry for AssignAdminOwnerInstructionEntry {
    const KIND: InstructionKind = InstructionKind::AssignRole;
    const FIELDS: &'static [&'static str] = &[
        "workspace_name",
        "workspace_slack_id",
        "user_email",
        "user_slack_id",
        "role",
    ];
}

/// Deactivate a user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeactivateRemoveUserInstructionEntry {
    pub user_email: String,
    pub user_slack_id: String,
}

impl InstructionEntry for DeactivateRemoveUserInstructionEntry {
    const KIND: InstructionKind = InstructionKind::DeactivateRemove;
    const FIELDS: &'static [&'static str] = &["user_email", "user_slack_id"];
}

/// Invite a new user into a workspace channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InviteNewUserInstructionEntry {
    pub workspace_name: String,
    pub workspace_slack_id: String,
    pub channel_name: String,
    pub channel_slack_id: String,
    pub user_email: String,
    pub user_name: String,
    #[serde(deserialize_with = "present_column")]
    pub title: Option<String>,
    #[serde(deserialize_with = "present_column")]
    pub section: Option<String>,
    #[serde(deserialize_with = "present_column")]
    pub location: Option<String>,
}

/// Optional cell whose column must still be in the header
///
/// A plain `Option` field is filled with `None` when its column is absent.
/// Going through `deserialize_with` makes an absent column a missing field
/// error while an empty cell still reads as `None`.
fn present_column<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer)
}

impl InstructionEntry for InviteNewUserInstructionEntry {
    const KIND: InstructionKind = InstructionKind::InviteNewUser;
    const FIELDS: &'static [&'static str] = &[
        "workspace_name",
        "workspace_slack_id",
        "channel_name",
        "channel_slack_id",
        "user_email",
        "user_name",
        "title",
        "section",
        "location",
    ];
}

/// Move a user from one email to another
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChangeUserEmailInstructionEntry {
    pub current_email: String,
    pub new_email: String,
}

impl InstructionEntry for ChangeUserEmailInstructionEntry {
    const KIND: InstructionKind = InstructionKind::ChangeEmail;
    const FIELDS: &'static [&'static str] = &["current_email", "new_email"];
}

/// Row carrying only an email
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SingleEmailInstructionEntry {
    pub user_email: String,
}

impl InstructionEntry for SingleEmailInstructionEntry {
    const KIND: InstructionKind = InstructionKind::SingleEmail;
    const FIELDS: &'static [&'static str] = &["user_email"];
}

/// Point a user's avatar at a new image
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AssignPhotoInstructionEntry {
    pub user_email: String,
    pub photo_url: String,
}

impl InstructionEntry for AssignPhotoInstructionEntry {
    const KIND: InstructionKind = InstructionKind::AssignPhoto;
    const FIELDS: &'static [&'static str] = &["user_email", "photo_url"];
}

#[cfg(test)]
mod tests {
    use super::*;

    fn serialized_header<E: InstructionEntry>(entry: &E) -> String {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.serialize(entry).unwrap();
        let bytes = writer.into_inner().unwrap();
        String::from_utf8(bytes).unwrap().lines().next().unwrap().to_string()
    }

    #[test]
    fn fields_match_serialized_header() {
        let add = AddUserInstructionEntry {
            workspace_name: "HQ".into(),
            workspace_slack_id: "T1".into(),
            channel_name: "general".into(),
            channel_slack_id: "C1".into(),
            user_email: "a@example.com".into(),
            user_slack_id: "U1".into(),
        };
        assert_eq!(serialized_header(&add), AddUserInstructionEntry::FIELDS.join(","));

        let invite = InviteNewUserInstructionEntry {
            workspace_name: "HQ".into(),
            workspace_slack_id: "T1".into(),
            channel_name: "general".into(),
            channel_slack_id: "C1".into(),
            user_email: "a@example.com".into(),
            user_name: "A".into(),
            title: None,
            section: None,
            location: None,
        };
        assert_eq!(
            serialized_header(&invite),
            InviteNewUserInstructionEntry::FIELDS.join(",")
        );

        let photo = AssignPhotoInstructionEntry {
            user_email: "a@example.com".into(),
            photo_url: "https://img".into(),
        };
        assert_eq!(serialized_header(&photo), AssignPhotoInstructionEntry::FIELDS.join(","));
    }

    #[test]
    fn role_parses_lowercase() {
        let data = "workspace_name,workspace_slack_id,user_email,user_slack_id,role\n\
                    HQ,T1,a@example.com,U1,owner\n";
        let mut reader = csv::Reader::from_reader(data.as_bytes());
        let row: AssignAdminOwnerInstructionEntry =
            reader.deserialize().next().unwrap().unwrap();
        assert_eq!(row.role, WorkspaceRole::Owner);
        assert_eq!(row.role.to_string(), "owner");
    }

    #[test]
    fn kinds_are_distinct() {
        assert_ne!(AddUserInstructionEntry::KIND, AssignPhotoInstructionEntry::KIND);
        assert_eq!(InstructionKind::AssignPhoto.to_string(), "assign_photo");
    }
}
