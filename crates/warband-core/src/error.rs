//! Domain error types.

use thiserror::Error;
use uuid::Uuid;

use crate::registry::UserId;

/// Top-level domain error type.
///
/// `RoleTaken`, `AlreadySignedUp` and `SessionClosed` are expected outcomes of
/// a slot toggle and are reported back to the actor; everything else is
/// terminal for the triggering request.
#[derive(Debug, Error)]
pub enum DomainError {
    /// Malformed or missing input.
    #[error("validation error: {0}")]
    Validation(String),

    /// The acting user has no registry profile.
    #[error("user {0} is not registered")]
    NotRegistered(UserId),

    /// The settlement caller has no registry profile.
    #[error("caller {0} is not registered")]
    CallerNotRegistered(UserId),

    /// One or more settlement participants have no registry profile.
    #[error("unregistered participants: {}", join_ids(.0))]
    UnregisteredParticipants(Vec<UserId>),

    /// The targeted slot is held by another user.
    #[error("slot {slot_index} is already taken by {occupant_name}")]
    RoleTaken {
        /// The contested slot.
        slot_index: usize,
        /// In-game name of the current occupant.
        occupant_name: String,
    },

    /// The actor already holds a different slot in the session.
    #[error("user is already signed up for slot {held_slot}")]
    AlreadySignedUp {
        /// The slot the actor currently occupies.
        held_slot: usize,
    },

    /// No signup session exists for the identifier.
    #[error("signup session not found: {0}")]
    SessionNotFound(Uuid),

    /// The signup session was closed or has expired.
    #[error("signup session {0} is closed")]
    SessionClosed(Uuid),

    /// No composition template matches the name.
    #[error("composition not found: {0}")]
    CompositionNotFound(String),

    /// An aggregate was not found.
    #[error("aggregate not found: {0}")]
    AggregateNotFound(Uuid),

    /// Optimistic concurrency conflict.
    #[error("concurrency conflict on aggregate {aggregate_id}: expected version {expected}, found {actual}")]
    ConcurrencyConflict {
        /// The aggregate that had the conflict.
        aggregate_id: Uuid,
        /// The expected version.
        expected: i64,
        /// The actual version found.
        actual: i64,
    },

    /// An infrastructure/persistence error.
    #[error("infrastructure error: {0}")]
    Infrastructure(String),
}

fn join_ids(ids: &[UserId]) -> String {
    ids.iter()
        .map(UserId::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}
