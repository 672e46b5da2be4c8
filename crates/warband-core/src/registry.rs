//! Profile registry port.
//!
//! The registry maps a chat-platform user to the in-game identity used for
//! rosters and payouts. It is an external collaborator; adapters live in
//! `warband-store`.

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Opaque chat-platform user identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Wraps a raw platform identifier.
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Returns the raw identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` for an empty or whitespace-only identifier.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl From<&str> for UserId {
    fn from(raw: &str) -> Self {
        Self(raw.to_owned())
    }
}

impl From<String> for UserId {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The platform user invoking an operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// Platform user identifier.
    pub user_id: UserId,
    /// Platform display name at the time of the request.
    pub display_name: String,
}

/// A registered player profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Platform user identifier.
    pub user_id: UserId,
    /// Platform display name captured at registration.
    pub display_name: String,
    /// Character name in the game.
    pub in_game_name: String,
    /// Guild the player belongs to.
    pub group_tag: String,
    /// When the profile was last registered.
    pub registered_at: DateTime<Utc>,
}

/// Lookup and upsert of player profiles.
#[async_trait]
pub trait ProfileRegistry: Send + Sync {
    /// Resolves a user to a profile, `None` when unregistered.
    async fn resolve_profile(&self, user_id: &UserId) -> Result<Option<Profile>, DomainError>;

    /// Creates or replaces the profile for `profile.user_id`.
    async fn upsert_profile(&self, profile: Profile) -> Result<(), DomainError>;
}
