//! Domain events for the composition context.

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use warband_core::error::DomainError;
use warband_core::event::{DomainEvent, EventMetadata};
use warband_core::registry::UserId;

/// Emitted when an author starts a new draft.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DraftStarted {
    /// The draft identifier.
    pub draft_id: Uuid,
    /// Trimmed composition name.
    pub name: String,
    /// The draft's author.
    pub created_by: UserId,
}

/// Emitted when a role is appended to a draft.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleAdded {
    /// The draft identifier.
    pub draft_id: Uuid,
    /// Trimmed role label.
    pub role_label: String,
}

/// Emitted when a draft is published to the catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DraftPublished {
    /// The draft identifier.
    pub draft_id: Uuid,
    /// Name the template was published under.
    pub name: String,
    /// Role labels in slot order.
    pub role_slots: Vec<String>,
}

/// Emitted when the author abandons a draft.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DraftCancelled {
    /// The draft identifier.
    pub draft_id: Uuid,
}

/// Emitted when a published draft could not enter the catalog and returns
/// to drafting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DraftReopened {
    /// The draft identifier.
    pub draft_id: Uuid,
    /// Why the catalog refused the template.
    pub reason: String,
}

/// Event type identifier for [`DraftStarted`].
pub const DRAFT_STARTED_EVENT_TYPE: &str = "composition.draft_started";

/// Event type identifier for [`RoleAdded`].
pub const ROLE_ADDED_EVENT_TYPE: &str = "composition.role_added";

/// Event type identifier for [`DraftPublished`].
pub const DRAFT_PUBLISHED_EVENT_TYPE: &str = "composition.draft_published";

/// Event type identifier for [`DraftCancelled`].
pub const DRAFT_CANCELLED_EVENT_TYPE: &str = "composition.draft_cancelled";

/// Event type identifier for [`DraftReopened`].
pub const DRAFT_REOPENED_EVENT_TYPE: &str = "composition.draft_reopened";

/// Event payload variants for the composition context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CompositionEventKind {
    /// A draft has been started.
    DraftStarted(DraftStarted),
    /// A role has been added.
    RoleAdded(RoleAdded),
    /// A draft has been published.
    DraftPublished(DraftPublished),
    /// A draft has been cancelled.
    DraftCancelled(DraftCancelled),
    /// A published draft has been returned to drafting.
    DraftReopened(DraftReopened),
}

/// Domain event envelope for the composition context.
#[derive(Debug, Clone)]
pub struct CompositionEvent {
    /// Event metadata.
    pub metadata: EventMetadata,
    /// Event-specific payload.
    pub kind: CompositionEventKind,
}

impl DomainEvent for CompositionEvent {
    fn event_type(&self) -> &'static str {
        match &self.kind {
            CompositionEventKind::DraftStarted(_) => DRAFT_STARTED_EVENT_TYPE,
            CompositionEventKind::RoleAdded(_) => ROLE_ADDED_EVENT_TYPE,
            CompositionEventKind::DraftPublished(_) => DRAFT_PUBLISHED_EVENT_TYPE,
            CompositionEventKind::DraftCancelled(_) => DRAFT_CANCELLED_EVENT_TYPE,
            CompositionEventKind::DraftReopened(_) => DRAFT_REOPENED_EVENT_TYPE,
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
