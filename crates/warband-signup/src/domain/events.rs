//! Domain events for the signup context.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use warband_core::error::DomainError;
use warband_core::event::{DomainEvent, EventMetadata};
use warband_core::registry::{Actor, Profile, UserId};

/// The player holding a slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Occupant {
    /// Platform user identifier.
    pub user_id: UserId,
    /// Platform display name when the slot was claimed.
    pub display_name: String,
    /// Character name in the game.
    pub in_game_name: String,
    /// Guild the player belongs to.
    pub group_tag: String,
}

impl Occupant {
    /// Combines the acting user with their registry profile.
    #[must_use]
    pub fn from_profile(actor: &Actor, profile: Profile) -> Self {
        Self {
            user_id: actor.user_id.clone(),
            display_name: actor.display_name.clone(),
            in_game_name: profile.in_game_name,
            group_tag: profile.group_tag,
        }
    }
}

/// Why a session stopped accepting toggles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloseReason {
    /// Finalized by a user.
    Manual,
    /// Closed by the expiry sweep.
    Expired,
}

/// Emitted when a session is instantiated from a template.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionOpened {
    /// The session identifier.
    pub session_id: Uuid,
    /// Name of the template the slots were copied from.
    pub template_name: String,
    /// Role labels, one per slot.
    pub role_slots: Vec<String>,
    /// User that opened the session.
    pub created_by: UserId,
    /// After this instant the session no longer accepts toggles.
    pub expires_at: Option<DateTime<Utc>>,
}

/// Emitted when a player takes an empty slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotClaimed {
    /// The session identifier.
    pub session_id: Uuid,
    /// Zero-based slot position.
    pub slot_index: usize,
    /// The new occupant.
    pub occupant: Occupant,
}

/// Emitted when a player leaves the slot they held.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotReleased {
    /// The session identifier.
    pub session_id: Uuid,
    /// Zero-based slot position.
    pub slot_index: usize,
    /// The departing occupant.
    pub user_id: UserId,
}

/// Emitted when a session is finalized or expires.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClosed {
    /// The session identifier.
    pub session_id: Uuid,
    /// User that closed the session; `None` for the expiry sweep.
    pub closed_by: Option<UserId>,
    /// Why the session closed.
    pub reason: CloseReason,
}

/// Event type identifier for [`SessionOpened`].
pub const SESSION_OPENED_EVENT_TYPE: &str = "signup.session_opened";

/// Event type identifier for [`SlotClaimed`].
pub const SLOT_CLAIMED_EVENT_TYPE: &str = "signup.slot_claimed";

/// Event type identifier for [`SlotReleased`].
pub const SLOT_RELEASED_EVENT_TYPE: &str = "signup.slot_released";

/// Event type identifier for [`SessionClosed`].
pub const SESSION_CLOSED_EVENT_TYPE: &str = "signup.session_closed";

/// Event payload variants for the signup context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SignupEventKind {
    /// A session has been opened.
    SessionOpened(SessionOpened),
    /// A slot has been claimed.
    SlotClaimed(SlotClaimed),
    /// A slot has been released.
    SlotReleased(SlotReleased),
    /// A session has been closed.
    SessionClosed(SessionClosed),
}

/// Domain event envelope for the signup context.
#[derive(Debug, Clone)]
pub struct SignupEvent {
    /// Event metadata.
    pub metadata: EventMetadata,
    /// Event-specific payload.
    pub kind: SignupEventKind,
}

impl DomainEvent for SignupEvent {
    fn event_type(&self) -> &'static str {
        match &self.kind {
            SignupEventKind::SessionOpened(_) => SESSION_OPENED_EVENT_TYPE,
            SignupEventKind::SlotClaimed(_) => SLOT_CLAIMED_EVENT_TYPE,
            SignupEventKind::SlotReleased(_) => SLOT_RELEASED_EVENT_TYPE,
            SignupEventKind::SessionClosed(_) => SESSION_CLOSED_EVENT_TYPE,
        }
    }

    fn to_payload(&self) -> Result<serde_json::Value, DomainError> {
        serde_json::to_value(&self.kind)
            .map_err(|e| DomainError::Infrastructure(format!("event serialization failed: {e}")))
    }

    fn metadata(&self) -> &EventMetadata {
        &self.metadata
    }
}
