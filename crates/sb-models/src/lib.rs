//! Slack Batch Models
//!
//! Plain data shared by every other crate in the workspace:
//! - Directory entities (`User`, `Workspace`, `Channel`)
//! - Typed instruction entries, one shape per CSV batch kind
//!
//! Nothing in here talks to the network or the filesystem.

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod entity;
pub mod instruction;

pub use entity::{prepare_name, Channel, EntityKind, User, Workspace};
pub use instruction::{
    AddUserInstructionEntry, AssignAdminOwnerInstructionEntry, AssignPhotoInstructionEntry,
    ChangeUserEmailInstructionEntry, DeactivateRemoveUserInstructionEntry, InstructionEntry,
    InstructionKind, InviteNewUserInstructionEntry, SingleEmailInstructionEntry, WorkspaceRole,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
