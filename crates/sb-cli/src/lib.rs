//! # sb-cli
//!
//! Command-line front end for slack-batch.
//!
//! ## Commands
//!
//! - `slack-batch update-user-photos` - Point avatars at new photo URLs
//! - `slack-batch change-user-emails` - Move users to a new primary email
//! - `slack-batch deactivate-users` - Deactivate accounts
//! - `slack-batch assign-roles` - Grant workspace admin or owner
//! - `slack-batch add-to-channels` - Add users to workspaces and channels
//! - `slack-batch invite-new-users` - Invite new users
//! - `slack-batch test` - Container self-check
//!
//! ## Configuration
//!
//! Settings come from `settings.toml` and `.secrets.toml` in `--config-dir`,
//! overridden by `SLACK_USER_TOKEN`, `LOG_TO_CONSOLE`, `LOG_TO_FILE`,
//! `LOG_DEBOUNCING`, `LOG_DIR` and `DOMAIN_SUFFIX`.

#![warn(unreachable_pub)]

pub mod commands;
pub mod config;
pub mod logging;

use clap::{Args, Parser, Subcommand};
use std::fmt;
use std::path::PathBuf;

pub use config::{Settings, SettingsError};

/// slack-batch - CSV driven Slack provisioning
#[derive(Debug, Parser)]
#[command(name = "slack-batch")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Directory holding settings.toml and .secrets.toml
    #[arg(long, default_value = ".")]
    pub config_dir: PathBuf,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Point each user's avatar at the listed photo URL
    UpdateUserPhotos(BatchArgs),
    /// Change each user's primary email
    ChangeUserEmails(BatchArgs),
    /// Deactivate each listed user
    DeactivateUsers(BatchArgs),
    /// Grant admin or owner on a workspace
    AssignRoles(BatchArgs),
    /// Add existing users to a workspace channel
    AddToChannels(BatchArgs),
    /// Invite new users into a workspace channel
    InviteNewUsers(BatchArgs),
    /// Check instruction files are mounted and the runtime works
    Test(TestArgs),
}

impl Commands {
    /// Batch kind and instruction file, `None` for `test`
    #[must_use]
    pub fn batch(&self) -> Option<(BatchKind, PathBuf)> {
        let (kind, args) = match self {
            Self::UpdateUserPhotos(args) => (BatchKind::UpdateUserPhotos, args),
            Self::ChangeUserEmails(args) => (BatchKind::ChangeUserEmails, args),
            Self::DeactivateUsers(args) => (BatchKind::DeactivateUsers, args),
            Self::AssignRoles(args) => (BatchKind::AssignRoles, args),
            Self::AddToChannels(args) => (BatchKind::AddToChannels, args),
            Self::InviteNewUsers(args) => (BatchKind::InviteNewUsers, args),
            Self::Test(_) => return None,
        };
        let file = args.file.clone().unwrap_or_else(|| kind.default_file());
        Some((kind, file))
    }
}

/// Arguments shared by every batch command
#[derive(Debug, Args)]
pub struct BatchArgs {
    /// Instruction file [default: instructions/<command>.csv]
    #[arg(long, short = 'f')]
    pub file: Option<PathBuf>,
}

/// Arguments for the self-check
#[derive(Debug, Args)]
pub struct TestArgs {
    /// Seconds to sleep on the runtime
    #[arg(long, default_value_t = 5)]
    pub sleep_secs: u64,
}

/// Batch subcommands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchKind {
    /// Point avatars at new images
    UpdateUserPhotos,
    /// Move users to a new primary email
    ChangeUserEmails,
    /// Deactivate users everywhere
    DeactivateUsers,
    /// Grant workspace admin or owner
    AssignRoles,
    /// Add existing users to workspace channels
    AddToChannels,
    /// Invite brand new users
    InviteNewUsers,
}

impl BatchKind {
    /// Every batch, in help order
    pub const ALL: [Self; 6] = [
        Self::UpdateUserPhotos,
        Self::ChangeUserEmails,
        Self::DeactivateUsers,
        Self::AssignRoles,
        Self::AddToChannels,
        Self::InviteNewUsers,
    ];

    /// Subcommand name
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::UpdateUserPhotos => "update-user-photos",
            Self::ChangeUserEmails => "change-user-emails",
            Self::DeactivateUsers => "deactivate-users",
            Self::AssignRoles => "assign-roles",
            Self::AddToChannels => "add-to-channels",
            Self::InviteNewUsers => "invite-new-users",
        }
    }

    /// `instructions/<name>.csv` with underscores
    #[must_use]
    pub fn default_file(self) -> PathBuf {
        PathBuf::from(format!("instructions/{}.csv", self.name().replace('-', "_")))
    }
}

impl fmt::Display for BatchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_defaults_to_instructions_dir() {
        let cli = Cli::parse_from(["slack-batch", "update-user-photos"]);
        let (kind, file) = cli.command.batch().unwrap();
        assert_eq!(kind, BatchKind::UpdateUserPhotos);
        assert_eq!(file, PathBuf::from("instructions/update_user_photos.csv"));
        assert_eq!(cli.config_dir, PathBuf::from("."));
    }

    #[test]
    fn file_flag_overrides_default() {
        let cli = Cli::parse_from([
            "slack-batch",
            "--config-dir",
            "/etc/slack-batch",
            "invite-new-users",
            "--file",
            "/data/new.csv",
        ]);
        let (kind, file) = cli.command.batch().unwrap();
        assert_eq!(kind, BatchKind::InviteNewUsers);
        assert_eq!(file, PathBuf::from("/data/new.csv"));
        assert_eq!(cli.config_dir, PathBuf::from("/etc/slack-batch"));
    }

    #[test]
    fn self_check_is_not_a_batch() {
        let cli = Cli::parse_from(["slack-batch", "test", "--sleep-secs", "0"]);
        assert!(cli.command.batch().is_none());
        assert!(matches!(cli.command, Commands::Test(TestArgs { sleep_secs: 0 })));
    }

    #[test]
    fn every_batch_has_a_subcommand() {
        for kind in BatchKind::ALL {
            let cli = Cli::try_parse_from(["slack-batch", kind.name()]).unwrap();
            assert_eq!(cli.command.batch().unwrap().0, kind);
        }
    }
}
