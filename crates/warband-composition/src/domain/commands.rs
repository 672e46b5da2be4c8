//! Commands for the composition context.

use uuid::Uuid;
use warband_core::command::Command;
use warband_core::registry::UserId;

/// Command to start a new composition draft.
#[derive(Debug, Clone)]
pub struct StartDraft {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// Composition name as typed.
    pub name: String,
    /// The author.
    pub created_by: UserId,
}

impl Command for StartDraft {
    fn command_type(&self) -> &'static str {
        "composition.start_draft"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn issued_by(&self) -> Option<&UserId> {
        Some(&self.created_by)
    }
}

/// Command to append a role to a draft.
#[derive(Debug, Clone)]
pub struct AddRole {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The draft identifier.
    pub draft_id: Uuid,
    /// Role label as typed.
    pub role_label: String,
    /// User issuing the command; must be the author.
    pub actor: UserId,
}

impl Command for AddRole {
    fn command_type(&self) -> &'static str {
        "composition.add_role"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn issued_by(&self) -> Option<&UserId> {
        Some(&self.actor)
    }
}

/// Command to publish a draft to the catalog.
#[derive(Debug, Clone)]
pub struct PublishDraft {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The draft identifier.
    pub draft_id: Uuid,
    /// User issuing the command; must be the author.
    pub actor: UserId,
}

impl Command for PublishDraft {
    fn command_type(&self) -> &'static str {
        "composition.publish_draft"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn issued_by(&self) -> Option<&UserId> {
        Some(&self.actor)
    }
}

/// Command to abandon a draft.
#[derive(Debug, Clone)]
pub struct CancelDraft {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The draft identifier.
    pub draft_id: Uuid,
    /// User issuing the command; must be the author.
    pub actor: UserId,
}

impl Command for CancelDraft {
    fn command_type(&self) -> &'static str {
        "composition.cancel_draft"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn issued_by(&self) -> Option<&UserId> {
        Some(&self.actor)
    }
}
