//! Test repositories — mock `EventRepository` implementations for tests.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;
use warband_core::error::DomainError;
use warband_core::repository::{EventRepository, StoredEvent};

/// An event repository that records all `append_events` calls. Returns the
/// configured stream from every `load_events` call and always succeeds on
/// `append_events`.
#[derive(Debug)]
pub struct RecordingEventRepository {
    stream: Vec<StoredEvent>,
    appended: Mutex<Vec<(Uuid, i64, Vec<StoredEvent>)>>,
}

impl RecordingEventRepository {
    /// Create a new recording repository that will return `stream` from
    /// every `load_events` call.
    #[must_use]
    pub fn new(stream: Vec<StoredEvent>) -> Self {
        Self {
            stream,
            appended: Mutex::new(Vec::new()),
        }
    }

    /// Returns a snapshot of all events that were appended.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn appended_events(&self) -> Vec<(Uuid, i64, Vec<StoredEvent>)> {
        self.appended.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventRepository for RecordingEventRepository {
    async fn load_events(&self, _aggregate_id: Uuid) -> Result<Vec<StoredEvent>, DomainError> {
        Ok(self.stream.clone())
    }

    async fn append_events(
        &self,
        aggregate_id: Uuid,
        expected_version: i64,
        events: &[StoredEvent],
    ) -> Result<(), DomainError> {
        self.appended
            .lock()
            .unwrap()
            .push((aggregate_id, expected_version, events.to_vec()));
        Ok(())
    }

    async fn open_aggregate_ids(
        &self,
        opened_event_type: &str,
        closed_event_type: &str,
    ) -> Result<Vec<Uuid>, DomainError> {
        let closed = self
            .stream
            .iter()
            .any(|e| e.event_type == closed_event_type);
        let mut ids: Vec<Uuid> = self
            .stream
            .iter()
            .filter(|e| !closed && e.event_type == opened_event_type)
            .map(|e| e.aggregate_id)
            .collect();
        ids.dedup();
        Ok(ids)
    }

    async fn evict_closed_before(
        &self,
        _closed_event_type: &str,
        _cutoff: DateTime<Utc>,
    ) -> Result<usize, DomainError> {
        Ok(0)
    }
}

/// An event repository that always returns an empty event list and silently
/// accepts appends. Useful for testing "not found" scenarios and creation
/// commands.
#[derive(Debug)]
pub struct EmptyEventRepository;

#[async_trait]
impl EventRepository for EmptyEventRepository {
    async fn load_events(&self, _aggregate_id: Uuid) -> Result<Vec<StoredEvent>, DomainError> {
        Ok(vec![])
    }

    async fn append_events(
        &self,
        _aggregate_id: Uuid,
        _expected_version: i64,
        _events: &[StoredEvent],
    ) -> Result<(), DomainError> {
        Ok(())
    }

    async fn open_aggregate_ids(
        &self,
        _opened_event_type: &str,
        _closed_event_type: &str,
    ) -> Result<Vec<Uuid>, DomainError> {
        Ok(vec![])
    }

    async fn evict_closed_before(
        &self,
        _closed_event_type: &str,
        _cutoff: DateTime<Utc>,
    ) -> Result<usize, DomainError> {
        Ok(0)
    }
}

/// An event repository that always returns an infrastructure error. Useful for
/// testing error-handling paths.
#[derive(Debug)]
pub struct FailingEventRepository;

#[async_trait]
impl EventRepository for FailingEventRepository {
    async fn load_events(&self, _aggregate_id: Uuid) -> Result<Vec<StoredEvent>, DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }

    async fn append_events(
        &self,
        _aggregate_id: Uuid,
        _expected_version: i64,
        _events: &[StoredEvent],
    ) -> Result<(), DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }

    async fn open_aggregate_ids(
        &self,
        _opened_event_type: &str,
        _closed_event_type: &str,
    ) -> Result<Vec<Uuid>, DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }

    async fn evict_closed_before(
        &self,
        _closed_event_type: &str,
        _cutoff: DateTime<Utc>,
    ) -> Result<usize, DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }
}
