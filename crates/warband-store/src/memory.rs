//! In-memory adapters.
//!
//! Used when no `DATABASE_URL` is configured and by the test suites that
//! exercise real optimistic-concurrency behaviour.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use warband_core::catalog::{CompositionCatalog, CompositionTemplate};
use warband_core::error::DomainError;
use warband_core::registry::{Profile, ProfileRegistry, UserId};
use warband_core::repository::{EventRepository, StoredEvent};

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, DomainError> {
    mutex
        .lock()
        .map_err(|_| DomainError::Infrastructure("in-memory store lock poisoned".into()))
}

#[derive(Debug, Default)]
struct Streams {
    by_aggregate: HashMap<Uuid, Vec<StoredEvent>>,
    first_seen: Vec<Uuid>,
}

/// Event repository holding every stream in process memory.
///
/// The version check and the append happen under one lock, which gives the
/// same compare-and-swap semantics as the PostgreSQL unique constraint.
#[derive(Debug, Default)]
pub struct InMemoryEventRepository {
    streams: Mutex<Streams>,
}

impl InMemoryEventRepository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EventRepository for InMemoryEventRepository {
    async fn load_events(&self, aggregate_id: Uuid) -> Result<Vec<StoredEvent>, DomainError> {
        let streams = lock(&self.streams)?;
        Ok(streams
            .by_aggregate
            .get(&aggregate_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn append_events(
        &self,
        aggregate_id: Uuid,
        expected_version: i64,
        events: &[StoredEvent],
    ) -> Result<(), DomainError> {
        let mut streams = lock(&self.streams)?;
        let actual = streams
            .by_aggregate
            .get(&aggregate_id)
            .and_then(|stream| stream.last())
            .map_or(0, |last| last.sequence_number);

        if actual != expected_version {
            return Err(DomainError::ConcurrencyConflict {
                aggregate_id,
                expected: expected_version,
                actual,
            });
        }

        if !streams.by_aggregate.contains_key(&aggregate_id) {
            streams.first_seen.push(aggregate_id);
        }
        streams
            .by_aggregate
            .entry(aggregate_id)
            .or_default()
            .extend_from_slice(events);
        Ok(())
    }

    async fn open_aggregate_ids(
        &self,
        opened_event_type: &str,
        closed_event_type: &str,
    ) -> Result<Vec<Uuid>, DomainError> {
        let streams = lock(&self.streams)?;
        Ok(streams
            .first_seen
            .iter()
            .filter(|id| {
                streams.by_aggregate.get(id).is_some_and(|stream| {
                    stream.iter().any(|e| e.event_type == opened_event_type)
                        && !stream.iter().any(|e| e.event_type == closed_event_type)
                })
            })
            .copied()
            .collect())
    }

    async fn evict_closed_before(
        &self,
        closed_event_type: &str,
        cutoff: DateTime<Utc>,
    ) -> Result<usize, DomainError> {
        let mut streams = lock(&self.streams)?;
        let before = streams.by_aggregate.len();
        streams.by_aggregate.retain(|_, stream| {
            !stream
                .iter()
                .any(|e| e.event_type == closed_event_type && e.occurred_at < cutoff)
        });
        let Streams {
            by_aggregate,
            first_seen,
        } = &mut *streams;
        first_seen.retain(|id| by_aggregate.contains_key(id));
        Ok(before - by_aggregate.len())
    }
}

/// Profile registry backed by a hash map.
#[derive(Debug, Default)]
pub struct InMemoryProfileRegistry {
    profiles: Mutex<HashMap<UserId, Profile>>,
}

impl InMemoryProfileRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry pre-populated with `profiles`.
    #[must_use]
    pub fn with_profiles(profiles: impl IntoIterator<Item = Profile>) -> Self {
        let profiles = profiles
            .into_iter()
            .map(|p| (p.user_id.clone(), p))
            .collect();
        Self {
            profiles: Mutex::new(profiles),
        }
    }
}

#[async_trait]
impl ProfileRegistry for InMemoryProfileRegistry {
    async fn resolve_profile(&self, user_id: &UserId) -> Result<Option<Profile>, DomainError> {
        Ok(lock(&self.profiles)?.get(user_id).cloned())
    }

    async fn upsert_profile(&self, profile: Profile) -> Result<(), DomainError> {
        lock(&self.profiles)?.insert(profile.user_id.clone(), profile);
        Ok(())
    }
}

/// Composition catalog kept in publication order.
#[derive(Debug, Default)]
pub struct InMemoryCompositionCatalog {
    templates: Mutex<Vec<CompositionTemplate>>,
}

impl InMemoryCompositionCatalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CompositionCatalog for InMemoryCompositionCatalog {
    async fn find_by_name(&self, name: &str) -> Result<Option<CompositionTemplate>, DomainError> {
        let wanted = name.to_lowercase();
        Ok(lock(&self.templates)?
            .iter()
            .find(|t| t.name.to_lowercase() == wanted)
            .cloned())
    }

    async fn list_names(&self) -> Result<Vec<String>, DomainError> {
        let mut names: Vec<String> = lock(&self.templates)?
            .iter()
            .map(|t| t.name.clone())
            .collect();
        names.sort();
        names.dedup();
        Ok(names)
    }

    async fn insert(&self, template: CompositionTemplate) -> Result<(), DomainError> {
        let mut templates = lock(&self.templates)?;
        if templates.iter().any(|t| t.name == template.name) {
            return Err(DomainError::Validation(format!(
                "a composition named {:?} already exists",
                template.name
            )));
        }
        templates.push(template);
        Ok(())
    }
}
