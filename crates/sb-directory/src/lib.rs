//! Slack Batch Directory
//!
//! Rate-limit aware client for Slack Enterprise Grid:
//! - `DirectoryClient`: every user, workspace and channel operation
//! - `Debouncer`: per-operation cooldown shared by all calls
//! - `AdminApi` / `ScimApi`: remote seams, with `reqwest` implementations
//!
//! # Example
//!
//! ```rust,ignore
//! use sb_directory::{DirectoryClient, DirectoryConfig};
//!
//! let client = DirectoryClient::connect(&token, DirectoryConfig::new())?;
//! if let Some(user) = client.search_user("jane@example.com").await? {
//!     client.update_photo(&user.id, "https://img.example.com/jane.png").await?;
//! }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod client;
pub mod debounce;
pub mod error;
pub mod http;
pub mod scim;
pub mod transport;

pub use client::{DirectoryClient, DirectoryConfig, MultipleMatchPolicy, MAX_DOMAIN_LEN};
pub use debounce::{ApiOperation, Debouncer, COOLDOWN_PAD};
pub use error::DirectoryError;
pub use http::{HttpAdminApi, HttpScimApi, DEFAULT_SCIM_BASE, DEFAULT_WEB_API_BASE};
pub use scim::{DirectoryUser, ScimEmail, ScimResponse, ScimUser};
pub use transport::{AdminApi, ScimApi};
