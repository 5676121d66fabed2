//! Slack Batch Instructions
//!
//! CSV batch files in, typed instruction entries out:
//! - One restartable, lazily decoded sequence per instruction kind
//! - A scoped write session that streams canonical rows to disk
//!
//! # Example
//!
//! ```rust,ignore
//! use sb_instructions::InstructionSource;
//!
//! let source = InstructionSource::open("instructions/update_user_photos.csv")?;
//! for row in source.assign_photo_instructions()? {
//!     let row = row?;
//!     println!("{} -> {}", row.user_email, row.photo_url);
//! }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod error;
pub mod source;

pub use error::InstructionError;
pub use source::{Entries, InstructionSource};
