//! Per-operation cooldown
//!
//! Before each remote call the client waits until at least `60 / rate`
//! seconds have passed since the previous call with the same key, plus a
//! one second pad. The first call for a key never waits.
//!
//! Keys name logical operations, not endpoints: every SCIM patch shares
//! `patch_user` regardless of what it patches.
//!
//! Each key owns an async mutex that is held across the sleep, so concurrent
//! callers on one key queue up instead of racing past the cooldown.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};

/// Extra wait added on top of the computed cooldown
pub const COOLDOWN_PAD: Duration = Duration::from_secs(1);

/// Logical remote operations and their published rate limits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiOperation {
    /// SCIM create user
    CreateUser,
    /// SCIM search users
    ScimSearchUsers,
    /// SCIM replace user
    UpdateUser,
    /// Any SCIM partial update (email, photo, activation)
    PatchUser,
    /// SCIM deactivation
    AdminUsersDelete,
    /// `admin.teams.list`
    AdminTeamsList,
    /// `admin.teams.create`
    AdminTeamsCreate,
    /// `conversations.create`
    ConversationsCreate,
    /// `admin.conversations.setTeams`
    SetTeams,
    /// `admin.users.assign`
    AdminUsersAssign,
    /// `admin.conversations.invite`
    AdminConversationsInvite,
    /// `users.list`
    UsersList,
    /// `admin.users.remove`
    AdminUsersRemove,
    /// `admin.conversations.convertToPrivate`
    AdminConversationsConvertToPrivate,
    /// `admin.users.setAdmin`
    AdminUsersSetAdmin,
    /// `admin.users.setOwner`
    AdminUsersSetOwner,
    /// `admin.users.invite`
    AdminUsersInvite,
}

impl ApiOperation {
    /// Debounce key
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::CreateUser => "create_user",
            Self::ScimSearchUsers => "scim_search_users",
            Self::UpdateUser => "update_user",
            Self::PatchUser => "patch_user",
            Self::AdminUsersDelete => "admin_users_delete",
            Self::AdminTeamsList => "admin_teams_list",
            Self::AdminTeamsCreate => "admin_teams_create",
            Self::ConversationsCreate => "conversations_create",
            Self::SetTeams => "set_teams",
            Self::AdminUsersAssign => "admin_users_assign",
            Self::AdminConversationsInvite => "admin_conversations_invite",
            Self::UsersList => "users_list",
            Self::AdminUsersRemove => "admin_users_remove",
            Self::AdminConversationsConvertToPrivate => "admin_conversations_convertToPrivate",
            Self::AdminUsersSetAdmin => "admin_users_setAdmin",
            Self::AdminUsersSetOwner => "admin_users_setOwner",
            Self::AdminUsersInvite => "admin_users_invite",
        }
    }

    /// Allowed calls per minute
    #[must_use]
    pub const fn rate_limit_per_minute(self) -> u32 {
        match self {
            Self::AdminUsersDelete => 90,
            Self::AdminTeamsList => 50,
            Self::AdminTeamsCreate => 1,
            _ => 20,
        }
    }
}

impl fmt::Display for ApiOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Cooldown table keyed by operation name
#[derive(Debug, Default)]
pub struct Debouncer {
    /// Last proceed time per key
    last_calls: DashMap<String, Arc<Mutex<Instant>>>,
    /// Log waits at info instead of debug
    log_waits: bool,
}

impl Debouncer {
    /// Create empty table
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With wait logging at info level
    #[inline]
    #[must_use]
    pub fn with_wait_logging(mut self, enabled: bool) -> Self {
        self.log_waits = enabled;
        self
    }

    /// Minimum spacing between two calls at `rate_limit_per_minute`
    #[inline]
    #[must_use]
    pub fn interval(rate_limit_per_minute: u32) -> Duration {
        Duration::from_secs_f64(60.0 / f64::from(rate_limit_per_minute.max(1)))
    }

    /// Wait out the cooldown for `key`, then record the proceed time
    ///
    /// Returns how long the call slept.
    pub async fn wait(&self, key: &str, rate_limit_per_minute: u32) -> Duration {
        let slot = match self.last_calls.entry(key.to_owned()) {
            Entry::Vacant(vacant) => {
                vacant.insert(Arc::new(Mutex::new(Instant::now())));
                return Duration::ZERO;
            }
            Entry::Occupied(occupied) => Arc::clone(occupied.get()),
        };

        let mut last = slot.lock().await;
        let interval = Self::interval(rate_limit_per_minute);
        let elapsed = last.elapsed();

        let mut slept = Duration::ZERO;
        if elapsed < interval {
            slept = interval - elapsed + COOLDOWN_PAD;
            if self.log_waits {
                tracing::info!(
                    "Sleeping for {:.3} seconds to avoid rate limit for '{key}'",
                    slept.as_secs_f64()
                );
            } else {
                tracing::debug!(key, wait_secs = slept.as_secs_f64(), "debounce wait");
            }
            sleep(slept).await;
        }

        *last = Instant::now();
        slept
    }

    /// Debounce a known operation at its own rate
    #[inline]
    pub async fn wait_for(&self, operation: ApiOperation) -> Duration {
        self.wait(operation.key(), operation.rate_limit_per_minute())
            .await
    }

    /// Last recorded proceed time for `key`
    pub async fn last_call(&self, key: &str) -> Option<Instant> {
        let slot = self
            .last_calls
            .get(key)
            .map(|entry| Arc::clone(entry.value()))?;
        let last = *slot.lock().await;
        Some(last)
    }

    /// Every key ever debounced, sorted
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .last_calls
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        keys.sort();
        keys
    }
}
