//! Slack Batch Core
//!
//! Batch processors that turn instruction files into directory mutations:
//! - One async processor per instruction kind
//! - `BatchReport` counting what happened to each row
//!
//! Processors run rows strictly in file order on the caller's task. The
//! directory client's cooldown is the only pacing.

#![warn(unreachable_pub)]

pub mod error;
pub mod processors;
pub mod report;

pub use error::ProcessError;
pub use processors::{
    add_to_channel_processor, assign_role_processor, change_user_email_processor,
    deactivate_user_processor, invite_new_user_processor, update_user_photo_processor,
};
pub use report::{BatchReport, RowOutcome};
