//! Commands for the signup context.

use chrono::Duration;
use uuid::Uuid;
use warband_core::command::Command;
use warband_core::registry::{Actor, UserId};

/// Command to open a signup session from a composition template.
#[derive(Debug, Clone)]
pub struct OpenSession {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// Template name, matched case-insensitively.
    pub composition_name: String,
    /// User opening the session.
    pub created_by: UserId,
    /// Lifetime of the session; `None` keeps it open until closed.
    pub ttl: Option<Duration>,
}

impl Command for OpenSession {
    fn command_type(&self) -> &'static str {
        "signup.open_session"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn issued_by(&self) -> Option<&UserId> {
        Some(&self.created_by)
    }
}

/// Command to claim or release a slot.
#[derive(Debug, Clone)]
pub struct ToggleSlot {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The session identifier.
    pub session_id: Uuid,
    /// Zero-based slot position.
    pub slot_index: usize,
    /// The player pressing the slot.
    pub actor: Actor,
}

impl Command for ToggleSlot {
    fn command_type(&self) -> &'static str {
        "signup.toggle_slot"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn issued_by(&self) -> Option<&UserId> {
        Some(&self.actor.user_id)
    }
}

/// Command to finalize a session.
#[derive(Debug, Clone)]
pub struct CloseSession {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The session identifier.
    pub session_id: Uuid,
    /// User closing the session.
    pub closed_by: UserId,
}

impl Command for CloseSession {
    fn command_type(&self) -> &'static str {
        "signup.close_session"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn issued_by(&self) -> Option<&UserId> {
        Some(&self.closed_by)
    }
}

/// Command to close every open session past its expiry and evict sessions
/// that have been closed for longer than `retention`.
#[derive(Debug, Clone)]
pub struct SweepExpiredSessions {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// How long a closed session stays readable before it is evicted.
    pub retention: Duration,
}

impl Command for SweepExpiredSessions {
    fn command_type(&self) -> &'static str {
        "signup.sweep_expired_sessions"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn issued_by(&self) -> Option<&UserId> {
        None
    }
}
