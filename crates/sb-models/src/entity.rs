//! Directory entities
//!
//! Records mirror what exists (or should exist) on the Slack side. The remote
//! id is `None` until the platform assigns one; after that it is treated as
//! stable and is the only identity used for comparisons.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("static regex"));

/// Lowercase `name` and collapse every whitespace run into a single hyphen.
///
/// Used for channel names and workspace domains.
#[must_use]
pub fn prepare_name(name: &str) -> String {
    WHITESPACE.replace_all(&name.to_lowercase(), "-").into_owned()
}

/// Entity classification used in creation logs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    /// Slack user account
    User,
    /// Workspace (team) inside the org
    Workspace,
    /// Channel (conversation)
    Channel,
}

impl EntityKind {
    /// Lowercase label
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Workspace => "workspace",
            Self::Channel => "channel",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Slack user
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct User {
    /// Remote id, set once the account exists
    pub slack_id: Option<String>,
    /// Full name, unique within the batch
    pub name: String,
    /// Primary email
    pub email: String,
    /// Job title
    pub title: Option<String>,
    /// Division
    pub section: Option<String>,
    /// Phone extension
    pub extension: Option<String>,
    /// Department
    pub location: Option<String>,
}

impl User {
    /// Create user with the two mandatory fields
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            ..Self::default()
        }
    }

    /// With remote id
    #[inline]
    #[must_use]
    pub fn with_slack_id(mut self, slack_id: impl Into<String>) -> Self {
        self.slack_id = Some(slack_id.into());
        self
    }

    /// With job title
    #[inline]
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// With division
    #[inline]
    #[must_use]
    pub fn with_section(mut self, section: impl Into<String>) -> Self {
        self.section = Some(section.into());
        self
    }

    /// With department
    #[inline]
    #[must_use]
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Part of the email before `@`
    #[must_use]
    pub fn email_local_part(&self) -> &str {
        self.email.split('@').next().unwrap_or(&self.email)
    }

    /// Entity kind
    #[inline]
    #[must_use]
    pub const fn kind(&self) -> EntityKind {
        EntityKind::User
    }
}

/// Slack workspace (team)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Workspace {
    /// Remote id, set once the workspace exists
    pub slack_id: Option<String>,
    /// Display name
    pub name: String,
}

impl Workspace {
    /// Create workspace by name
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            slack_id: None,
            name: name.into(),
        }
    }

    /// With remote id
    #[inline]
    #[must_use]
    pub fn with_slack_id(mut self, slack_id: impl Into<String>) -> Self {
        self.slack_id = Some(slack_id.into());
        self
    }

    /// Domain slug: prepared name plus `-{suffix}`
    ///
    /// Leading whitespace is dropped before normalization.
    #[must_use]
    pub fn domain_slug(&self, suffix: &str) -> String {
        format!("{}-{suffix}", prepare_name(self.name.trim_start()))
    }

    /// Entity kind
    #[inline]
    #[must_use]
    pub const fn kind(&self) -> EntityKind {
        EntityKind::Workspace
    }
}

/// Slack channel
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Channel {
    /// Remote id, set once the channel exists
    pub slack_id: Option<String>,
    /// Human name
    pub name: String,
    /// Channel purpose
    pub description: Option<String>,
    /// Name of the workspace that owns the channel
    pub main_workspace: String,
    /// Names of workspaces the channel is shared into
    pub additional_workspaces: Vec<String>,
}

impl Channel {
    /// Create channel owned by `main_workspace`
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>, main_workspace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            main_workspace: main_workspace.into(),
            ..Self::default()
        }
    }

    /// With remote id
    #[inline]
    #[must_use]
    pub fn with_slack_id(mut self, slack_id: impl Into<String>) -> Self {
        self.slack_id = Some(slack_id.into());
        self
    }

    /// With description
    #[inline]
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Name as Slack accepts it
    #[must_use]
    pub fn prepared_name(&self) -> String {
        prepare_name(&self.name)
    }

    /// Entity kind
    #[inline]
    #[must_use]
    pub const fn kind(&self) -> EntityKind {
        EntityKind::Channel
    }
}
