//! Event repository abstraction.
//!
//! Signup sessions and composition drafts share this one store; each stream
//! is keyed by the aggregate's UUID and guarded by its sequence number.
//! Finished streams can be evicted once they are older than a retention
//! window.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::DomainError;

/// Stored representation of a domain event.
#[derive(Debug, Clone)]
pub struct StoredEvent {
    /// Unique event identifier.
    pub event_id: Uuid,
    /// Aggregate this event belongs to.
    pub aggregate_id: Uuid,
    /// Event type name for deserialization routing.
    pub event_type: String,
    /// Serialized event payload.
    pub payload: serde_json::Value,
    /// Sequence number within the aggregate stream.
    pub sequence_number: i64,
    /// Correlation ID for tracing.
    pub correlation_id: Uuid,
    /// Causation ID linking to the causing event/command.
    pub causation_id: Uuid,
    /// Timestamp of event creation.
    pub occurred_at: DateTime<Utc>,
}

/// Repository trait for loading and appending domain events.
#[async_trait]
pub trait EventRepository: Send + Sync {
    /// Load all events for a given aggregate, ordered by sequence number.
    async fn load_events(&self, aggregate_id: Uuid) -> Result<Vec<StoredEvent>, DomainError>;

    /// Append new events to an aggregate stream with optimistic concurrency.
    /// `expected_version` is the last known sequence number; a mismatch
    /// fails with `DomainError::ConcurrencyConflict` and writes nothing.
    async fn append_events(
        &self,
        aggregate_id: Uuid,
        expected_version: i64,
        events: &[StoredEvent],
    ) -> Result<(), DomainError>;

    /// Lists the aggregates whose stream contains an `opened_event_type`
    /// event and no `closed_event_type` event, in first-seen order.
    async fn open_aggregate_ids(
        &self,
        opened_event_type: &str,
        closed_event_type: &str,
    ) -> Result<Vec<Uuid>, DomainError>;

    /// Deletes every stream whose `closed_event_type` event occurred before
    /// `cutoff`, returning how many streams were removed.
    async fn evict_closed_before(
        &self,
        closed_event_type: &str,
        cutoff: DateTime<Utc>,
    ) -> Result<usize, DomainError>;
}
