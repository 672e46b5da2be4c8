//! Command handlers for the signup context.
//!
//! Each handler loads the session stream, runs the aggregate method and
//! appends the produced events with the version it read. Toggles retry on a
//! version conflict so that concurrent presses on one session serialize.

use std::time::Duration;

use rand::Rng;
use uuid::Uuid;
use warband_core::aggregate::AggregateRoot;
use warband_core::catalog::CompositionCatalog;
use warband_core::clock::Clock;
use warband_core::error::DomainError;
use warband_core::event::{DomainEvent, EventMetadata, decode_payload};
use warband_core::registry::ProfileRegistry;
use warband_core::repository::{EventRepository, StoredEvent};

use crate::application::query_handlers::{SessionSummary, summarize};
use crate::domain::aggregates::{SignupSession, ToggleOutcome};
use crate::domain::commands::{CloseSession, OpenSession, SweepExpiredSessions, ToggleSlot};
use crate::domain::events::{
    CloseReason, Occupant, SESSION_CLOSED_EVENT_TYPE, SESSION_OPENED_EVENT_TYPE, SignupEvent,
    SignupEventKind,
};

/// Upper bound on load/append cycles for a single toggle.
pub const MAX_TOGGLE_ATTEMPTS: usize = 32;

/// Longest pause between two toggle attempts, in milliseconds.
const MAX_TOGGLE_BACKOFF_MS: u64 = 16;

/// Random pause before retrying, with a ceiling that grows with `attempt`
/// so that writers who keep colliding spread out.
fn toggle_backoff(attempt: usize) -> Duration {
    let ceiling = (2 * attempt as u64).min(MAX_TOGGLE_BACKOFF_MS);
    Duration::from_millis(rand::rng().random_range(0..=ceiling))
}

/// Result of a successfully handled command.
#[derive(Debug)]
pub struct SignupCommandResult {
    /// The session affected or created by the command.
    pub aggregate_id: Uuid,
    /// The session as it stands after the command.
    pub summary: SessionSummary,
    /// The stored events produced and persisted.
    pub stored_events: Vec<StoredEvent>,
}

/// Result of a successful toggle.
#[derive(Debug)]
pub struct ToggleSlotResult {
    /// Whether the slot was claimed or released.
    pub outcome: ToggleOutcome,
    /// The session as it stands after the toggle.
    pub summary: SessionSummary,
    /// The stored events produced and persisted.
    pub stored_events: Vec<StoredEvent>,
}

/// Reconstitutes a `SignupSession` from stored events.
///
/// # Errors
///
/// Returns `DomainError::Infrastructure` if event deserialization fails.
pub(crate) fn reconstitute(
    session_id: Uuid,
    existing_events: &[StoredEvent],
) -> Result<SignupSession, DomainError> {
    let mut session = SignupSession::new(session_id);
    for stored in existing_events {
        let kind: SignupEventKind = decode_payload(stored)?;
        let event = SignupEvent {
            metadata: EventMetadata::from_stored(stored),
            kind,
        };
        session.apply(&event);
    }
    Ok(session)
}

fn pending_stored_events(session: &SignupSession) -> Result<Vec<StoredEvent>, DomainError> {
    session
        .uncommitted_events()
        .iter()
        .map(DomainEvent::to_stored)
        .collect()
}

async fn load_session(
    session_id: Uuid,
    repo: &dyn EventRepository,
) -> Result<SignupSession, DomainError> {
    let existing_events = repo.load_events(session_id).await?;
    if existing_events.is_empty() {
        return Err(DomainError::SessionNotFound(session_id));
    }
    reconstitute(session_id, &existing_events)
}

/// Handles the `OpenSession` command: resolves the template, opens a new
/// session with every slot empty, and persists the resulting event.
///
/// # Errors
///
/// Returns `DomainError::CompositionNotFound` if no template matches the
/// name, `DomainError::Validation` if the template has no roles, or an
/// infrastructure error from the catalog or repository.
pub async fn handle_open_session(
    command: &OpenSession,
    clock: &dyn Clock,
    catalog: &dyn CompositionCatalog,
    repo: &dyn EventRepository,
) -> Result<SignupCommandResult, DomainError> {
    let name = command.composition_name.trim();
    let template = catalog
        .find_by_name(name)
        .await?
        .ok_or_else(|| DomainError::CompositionNotFound(name.to_owned()))?;

    let session_id = Uuid::new_v4();
    let mut session = SignupSession::new(session_id);
    session.open(
        &template,
        command.created_by.clone(),
        command.ttl,
        command.correlation_id,
        clock,
    )?;

    let stored_events = pending_stored_events(&session)?;
    repo.append_events(session_id, session.version(), &stored_events)
        .await?;
    session.commit();

    tracing::info!(
        %session_id,
        template = %template.name,
        slots = template.role_slots.len(),
        "signup session opened"
    );

    Ok(SignupCommandResult {
        aggregate_id: session_id,
        summary: summarize(&session, clock.now()),
        stored_events,
    })
}

/// Handles the `ToggleSlot` command.
///
/// The actor's profile is resolved once. The session is then reloaded and the
/// toggle re-evaluated whenever the append loses a version race, after a
/// short jittered pause, up to [`MAX_TOGGLE_ATTEMPTS`] times, so the decision
/// is always made against the state it is written on top of.
///
/// # Errors
///
/// - `DomainError::SessionNotFound` if the session has no events.
/// - `DomainError::NotRegistered` if the actor has no profile.
/// - Any rejection from [`SignupSession::toggle_slot`].
/// - `DomainError::ConcurrencyConflict` if every attempt lost its race.
pub async fn handle_toggle_slot(
    command: &ToggleSlot,
    clock: &dyn Clock,
    registry: &dyn ProfileRegistry,
    repo: &dyn EventRepository,
) -> Result<ToggleSlotResult, DomainError> {
    let mut session = load_session(command.session_id, repo).await?;

    let profile = registry
        .resolve_profile(&command.actor.user_id)
        .await?
        .ok_or_else(|| DomainError::NotRegistered(command.actor.user_id.clone()))?;
    let occupant = Occupant::from_profile(&command.actor, profile);

    let mut attempt = 1;
    loop {
        let outcome =
            session.toggle_slot(command.slot_index, &occupant, command.correlation_id, clock)?;
        let stored_events = pending_stored_events(&session)?;

        match repo
            .append_events(command.session_id, session.version(), &stored_events)
            .await
        {
            Ok(()) => {
                session.commit();
                tracing::debug!(
                    session_id = %command.session_id,
                    user_id = %command.actor.user_id,
                    ?outcome,
                    attempt,
                    "slot toggled"
                );
                return Ok(ToggleSlotResult {
                    outcome,
                    summary: summarize(&session, clock.now()),
                    stored_events,
                });
            }
            Err(DomainError::ConcurrencyConflict { .. }) if attempt < MAX_TOGGLE_ATTEMPTS => {
                tracing::debug!(
                    session_id = %command.session_id,
                    attempt,
                    "toggle lost version race, reloading"
                );
                tokio::time::sleep(toggle_backoff(attempt)).await;
                attempt += 1;
                session = load_session(command.session_id, repo).await?;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Handles the `CloseSession` command: finalizes the session so it no longer
/// accepts toggles.
///
/// # Errors
///
/// Returns `DomainError::SessionNotFound` if the session has no events,
/// `DomainError::SessionClosed` if it is already closed, or a repository
/// error.
pub async fn handle_close_session(
    command: &CloseSession,
    clock: &dyn Clock,
    repo: &dyn EventRepository,
) -> Result<SignupCommandResult, DomainError> {
    let mut session = load_session(command.session_id, repo).await?;

    session.close(
        Some(command.closed_by.clone()),
        CloseReason::Manual,
        command.correlation_id,
        clock,
    )?;

    let stored_events = pending_stored_events(&session)?;
    repo.append_events(command.session_id, session.version(), &stored_events)
        .await?;
    session.commit();

    tracing::info!(session_id = %command.session_id, closed_by = %command.closed_by, "signup session closed");

    Ok(SignupCommandResult {
        aggregate_id: command.session_id,
        summary: summarize(&session, clock.now()),
        stored_events,
    })
}

/// Outcome of one sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Sessions closed because their expiry had passed.
    pub expired: Vec<Uuid>,
    /// Closed sessions removed from the store.
    pub evicted: usize,
}

/// Handles the `SweepExpiredSessions` command: closes every open session
/// whose expiry has passed, then evicts sessions closed before
/// `now - retention`.
///
/// Only streams without a `SessionClosed` event are loaded. A session that
/// changes while being swept, or whose stream cannot be loaded, is skipped;
/// the next sweep picks it up again.
///
/// # Errors
///
/// Returns `DomainError::Infrastructure` if listing, appending or evicting
/// fails for a reason other than a version race.
pub async fn handle_sweep_expired_sessions(
    command: &SweepExpiredSessions,
    clock: &dyn Clock,
    repo: &dyn EventRepository,
) -> Result<SweepReport, DomainError> {
    let mut expired = Vec::new();

    let open_ids = repo
        .open_aggregate_ids(SESSION_OPENED_EVENT_TYPE, SESSION_CLOSED_EVENT_TYPE)
        .await?;
    for session_id in open_ids {
        let mut session = match load_session(session_id, repo).await {
            Ok(session) => session,
            Err(e) => {
                tracing::warn!(%session_id, error = %e, "cannot load session during sweep, skipping");
                continue;
            }
        };
        if !session.expire_if_due(command.correlation_id, clock) {
            continue;
        }
        let stored_events = pending_stored_events(&session)?;
        match repo
            .append_events(session_id, session.version(), &stored_events)
            .await
        {
            Ok(()) => expired.push(session_id),
            Err(DomainError::ConcurrencyConflict { .. }) => {
                tracing::debug!(%session_id, "session changed during sweep, skipping");
            }
            Err(e) => return Err(e),
        }
    }

    let evicted = match clock.now().checked_sub_signed(command.retention) {
        Some(cutoff) => {
            repo.evict_closed_before(SESSION_CLOSED_EVENT_TYPE, cutoff)
                .await?
        }
        None => 0,
    };

    if !expired.is_empty() || evicted > 0 {
        tracing::info!(expired = expired.len(), evicted, "signup sessions swept");
    }
    Ok(SweepReport { expired, evicted })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use chrono::{DateTime, Duration, Utc};
    use uuid::Uuid;
    use warband_core::catalog::{CompositionCatalog, CompositionTemplate};
    use warband_core::error::DomainError;
    use warband_core::registry::{Actor, UserId};
    use warband_core::repository::{EventRepository, StoredEvent};
    use warband_store::{InMemoryCompositionCatalog, InMemoryEventRepository};
    use warband_test_support::{
        CountingProfileRegistry, EmptyEventRepository, FailingEventRepository, FixedClock,
        RecordingEventRepository, fixed_now, profile,
    };

    use super::*;
    use crate::application::query_handlers::SessionState;
    use crate::domain::events::SLOT_CLAIMED_EVENT_TYPE;

    async fn catalog_with(roles: &[&str]) -> InMemoryCompositionCatalog {
        let catalog = InMemoryCompositionCatalog::new();
        catalog
            .insert(CompositionTemplate {
                name: "Castle Siege".to_owned(),
                role_slots: roles.iter().map(|r| (*r).to_owned()).collect(),
                created_by: UserId::from("1"),
                created_at: fixed_now(),
            })
            .await
            .unwrap();
        catalog
    }

    fn actor(user_id: &str) -> Actor {
        Actor {
            user_id: UserId::from(user_id),
            display_name: format!("user-{user_id}"),
        }
    }

    fn registry() -> CountingProfileRegistry {
        CountingProfileRegistry::new(vec![
            profile("2", "Aldric", "Phoenix Rebels"),
            profile("3", "Brena", "Phoenix Rebels"),
            profile("4", "Corvin", "Iron Wolves"),
        ])
    }

    async fn open(
        repo: &dyn EventRepository,
        roles: &[&str],
        ttl: Option<Duration>,
    ) -> Uuid {
        let catalog = catalog_with(roles).await;
        let command = OpenSession {
            correlation_id: Uuid::new_v4(),
            composition_name: "castle siege".to_owned(),
            created_by: UserId::from("1"),
            ttl,
        };
        handle_open_session(&command, &FixedClock(fixed_now()), &catalog, repo)
            .await
            .unwrap()
            .aggregate_id
    }

    fn toggle(session_id: Uuid, slot_index: usize, user_id: &str) -> ToggleSlot {
        ToggleSlot {
            correlation_id: Uuid::new_v4(),
            session_id,
            slot_index,
            actor: actor(user_id),
        }
    }

    #[tokio::test]
    async fn test_handle_open_session_persists_session_opened_event() {
        // Arrange
        let catalog = catalog_with(&["Tank", "Healer"]).await;
        let repo = RecordingEventRepository::new(Vec::new());
        let clock = FixedClock(fixed_now());
        let correlation_id = Uuid::new_v4();
        let command = OpenSession {
            correlation_id,
            composition_name: "  CASTLE SIEGE ".to_owned(),
            created_by: UserId::from("1"),
            ttl: Some(Duration::hours(12)),
        };

        // Act
        let result = handle_open_session(&command, &clock, &catalog, &repo)
            .await
            .unwrap();

        // Assert
        assert_eq!(result.summary.template_name, "Castle Siege");
        assert_eq!(result.summary.total_slots, 2);
        assert_eq!(result.summary.total_claimed, 0);
        assert_eq!(result.summary.expires_at, Some(fixed_now() + Duration::hours(12)));

        let appended = repo.appended_events();
        assert_eq!(appended.len(), 1);
        let (agg_id, expected_version, events) = &appended[0];
        assert_eq!(*agg_id, result.aggregate_id);
        assert_eq!(*expected_version, 0);
        assert_eq!(events[0].event_type, SESSION_OPENED_EVENT_TYPE);
        assert_eq!(events[0].sequence_number, 1);
        assert_eq!(events[0].correlation_id, correlation_id);
        assert_eq!(events[0].occurred_at, fixed_now());
    }

    #[tokio::test]
    async fn test_handle_open_session_returns_composition_not_found() {
        let catalog = InMemoryCompositionCatalog::new();
        let repo = RecordingEventRepository::new(Vec::new());
        let command = OpenSession {
            correlation_id: Uuid::new_v4(),
            composition_name: "Nope".to_owned(),
            created_by: UserId::from("1"),
            ttl: None,
        };

        let result = handle_open_session(&command, &FixedClock(fixed_now()), &catalog, &repo).await;

        assert!(matches!(result, Err(DomainError::CompositionNotFound(name)) if name == "Nope"));
        assert!(repo.appended_events().is_empty());
    }

    #[tokio::test]
    async fn test_handle_toggle_slot_claims_then_releases() {
        // Arrange
        let repo = InMemoryEventRepository::new();
        let session_id = open(&repo, &["Tank", "Healer"], None).await;
        let registry = registry();
        let clock = FixedClock(fixed_now());

        // Act
        let claimed = handle_toggle_slot(&toggle(session_id, 1, "2"), &clock, &registry, &repo)
            .await
            .unwrap();
        let released = handle_toggle_slot(&toggle(session_id, 1, "2"), &clock, &registry, &repo)
            .await
            .unwrap();

        // Assert
        assert_eq!(claimed.outcome, ToggleOutcome::Claimed { slot_index: 1 });
        let occupant = claimed.summary.slots[1].occupant.as_ref().unwrap();
        assert_eq!(occupant.in_game_name, "Aldric");
        assert_eq!(occupant.display_name, "user-2");
        assert_eq!(claimed.stored_events[0].event_type, SLOT_CLAIMED_EVENT_TYPE);

        assert_eq!(released.outcome, ToggleOutcome::Released { slot_index: 1 });
        assert_eq!(released.summary.total_claimed, 0);
        assert_eq!(released.summary.version, 3);
    }

    #[tokio::test]
    async fn test_handle_toggle_slot_rejects_unregistered_actor() {
        let repo = InMemoryEventRepository::new();
        let session_id = open(&repo, &["Tank"], None).await;
        let registry = registry();

        let result = handle_toggle_slot(
            &toggle(session_id, 0, "99"),
            &FixedClock(fixed_now()),
            &registry,
            &repo,
        )
        .await;

        assert!(matches!(result, Err(DomainError::NotRegistered(id)) if id.as_str() == "99"));
        assert_eq!(repo.load_events(session_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_handle_toggle_slot_on_missing_session_writes_nothing() {
        // Arrange
        let session_id = Uuid::new_v4();
        let repo = RecordingEventRepository::new(Vec::new());
        let registry = registry();

        // Act
        let result = handle_toggle_slot(
            &toggle(session_id, 0, "2"),
            &FixedClock(fixed_now()),
            &registry,
            &repo,
        )
        .await;

        // Assert
        match result.unwrap_err() {
            DomainError::SessionNotFound(id) => assert_eq!(id, session_id),
            other => panic!("expected SessionNotFound, got {other:?}"),
        }
        assert!(repo.appended_events().is_empty());
        assert_eq!(registry.lookups(), 0);
    }

    #[tokio::test]
    async fn test_handle_toggle_slot_after_expiry_is_session_closed() {
        let repo = InMemoryEventRepository::new();
        let session_id = open(&repo, &["Tank"], Some(Duration::minutes(10))).await;
        let later = FixedClock(fixed_now() + Duration::minutes(11));

        let result = handle_toggle_slot(&toggle(session_id, 0, "2"), &later, &registry(), &repo).await;

        assert!(matches!(result, Err(DomainError::SessionClosed(id)) if id == session_id));
    }

    #[tokio::test]
    async fn test_handle_toggle_slot_propagates_infrastructure_error() {
        let result = handle_toggle_slot(
            &toggle(Uuid::new_v4(), 0, "2"),
            &FixedClock(fixed_now()),
            &registry(),
            &FailingEventRepository,
        )
        .await;

        assert!(matches!(result, Err(DomainError::Infrastructure(_))));
    }

    /// Serves a fixed stream but rejects every append with a version
    /// conflict, counting the attempts.
    struct AlwaysConflictingRepository {
        stream: Vec<StoredEvent>,
        appends: AtomicUsize,
    }

    #[async_trait]
    impl EventRepository for AlwaysConflictingRepository {
        async fn load_events(&self, _aggregate_id: Uuid) -> Result<Vec<StoredEvent>, DomainError> {
            Ok(self.stream.clone())
        }

        async fn append_events(
            &self,
            aggregate_id: Uuid,
            expected_version: i64,
            _events: &[StoredEvent],
        ) -> Result<(), DomainError> {
            self.appends.fetch_add(1, Ordering::SeqCst);
            Err(DomainError::ConcurrencyConflict {
                aggregate_id,
                expected: expected_version,
                actual: expected_version + 1,
            })
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

    #[tokio::test]
    async fn test_handle_toggle_slot_gives_up_after_bounded_attempts() {
        // Arrange
        let seed = InMemoryEventRepository::new();
        let session_id = open(&seed, &["Tank"], None).await;
        let repo = AlwaysConflictingRepository {
            stream: seed.load_events(session_id).await.unwrap(),
            appends: AtomicUsize::new(0),
        };

        // Act
        let result = handle_toggle_slot(
            &toggle(session_id, 0, "2"),
            &FixedClock(fixed_now()),
            &registry(),
            &repo,
        )
        .await;

        // Assert
        assert!(matches!(result, Err(DomainError::ConcurrencyConflict { .. })));
        assert_eq!(repo.appends.load(Ordering::SeqCst), MAX_TOGGLE_ATTEMPTS);
    }

    /// Delegates to an in-memory store after losing the first `losses`
    /// append races.
    struct FlakyAppendRepository {
        inner: InMemoryEventRepository,
        losses: AtomicUsize,
    }

    #[async_trait]
    impl EventRepository for FlakyAppendRepository {
        async fn load_events(&self, aggregate_id: Uuid) -> Result<Vec<StoredEvent>, DomainError> {
            self.inner.load_events(aggregate_id).await
        }

        async fn append_events(
            &self,
            aggregate_id: Uuid,
            expected_version: i64,
            events: &[StoredEvent],
        ) -> Result<(), DomainError> {
            let lost = self
                .losses
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if lost {
                return Err(DomainError::ConcurrencyConflict {
                    aggregate_id,
                    expected: expected_version,
                    actual: expected_version + 1,
                });
            }
            self.inner
                .append_events(aggregate_id, expected_version, events)
                .await
        }

        async fn open_aggregate_ids(
            &self,
            opened_event_type: &str,
            closed_event_type: &str,
        ) -> Result<Vec<Uuid>, DomainError> {
            self.inner
                .open_aggregate_ids(opened_event_type, closed_event_type)
                .await
        }

        async fn evict_closed_before(
            &self,
            closed_event_type: &str,
            cutoff: DateTime<Utc>,
        ) -> Result<usize, DomainError> {
            self.inner.evict_closed_before(closed_event_type, cutoff).await
        }
    }

    #[tokio::test]
    async fn test_handle_toggle_slot_survives_a_long_run_of_lost_races() {
        // Arrange
        let inner = InMemoryEventRepository::new();
        let session_id = open(&inner, &["Tank"], None).await;
        let repo = FlakyAppendRepository {
            inner,
            losses: AtomicUsize::new(20),
        };

        // Act
        let result = handle_toggle_slot(
            &toggle(session_id, 0, "2"),
            &FixedClock(fixed_now()),
            &registry(),
            &repo,
        )
        .await
        .unwrap();

        // Assert
        assert_eq!(result.outcome, ToggleOutcome::Claimed { slot_index: 0 });
        assert_eq!(repo.losses.load(Ordering::SeqCst), 0);
        assert_eq!(result.summary.version, 2);
    }

    #[test]
    fn test_toggle_backoff_stays_under_ceiling() {
        for attempt in 1..MAX_TOGGLE_ATTEMPTS {
            let pause = toggle_backoff(attempt);
            assert!(pause <= std::time::Duration::from_millis(MAX_TOGGLE_BACKOFF_MS));
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_claims_on_one_slot_have_exactly_one_winner() {
        // Arrange
        let repo = Arc::new(InMemoryEventRepository::new());
        let session_id = open(repo.as_ref(), &["Tank", "Healer"], None).await;
        let registry = Arc::new(registry());
        let claimed = Arc::new(AtomicUsize::new(0));
        let role_taken = Arc::new(AtomicUsize::new(0));

        // Act
        let mut handles = Vec::new();
        for user_id in ["2", "3"] {
            let repo = Arc::clone(&repo);
            let registry = Arc::clone(&registry);
            let claimed = Arc::clone(&claimed);
            let role_taken = Arc::clone(&role_taken);
            handles.push(tokio::spawn(async move {
                let command = toggle(session_id, 0, user_id);
                match handle_toggle_slot(&command, &FixedClock(fixed_now()), &*registry, &*repo)
                    .await
                {
                    Ok(result) => {
                        assert_eq!(result.outcome, ToggleOutcome::Claimed { slot_index: 0 });
                        claimed.fetch_add(1, Ordering::SeqCst);
                    }
                    Err(DomainError::RoleTaken { slot_index: 0, .. }) => {
                        role_taken.fetch_add(1, Ordering::SeqCst);
                    }
                    Err(other) => panic!("unexpected error: {other:?}"),
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        // Assert
        assert_eq!(claimed.load(Ordering::SeqCst), 1);
        assert_eq!(role_taken.load(Ordering::SeqCst), 1);
        let events = repo.load_events(session_id).await.unwrap();
        assert_eq!(events.len(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_claims_by_one_user_hold_at_most_one_slot() {
        // Arrange
        let repo = Arc::new(InMemoryEventRepository::new());
        let session_id = open(repo.as_ref(), &["Tank", "Healer", "DPS", "Support"], None).await;
        let registry = Arc::new(registry());
        let claimed = Arc::new(AtomicUsize::new(0));

        // Act
        let mut handles = Vec::new();
        for slot_index in 0..4 {
            let repo = Arc::clone(&repo);
            let registry = Arc::clone(&registry);
            let claimed = Arc::clone(&claimed);
            handles.push(tokio::spawn(async move {
                let command = toggle(session_id, slot_index, "2");
                match handle_toggle_slot(&command, &FixedClock(fixed_now()), &*registry, &*repo)
                    .await
                {
                    Ok(_) => {
                        claimed.fetch_add(1, Ordering::SeqCst);
                    }
                    Err(DomainError::AlreadySignedUp { .. }) => {}
                    Err(other) => panic!("unexpected error: {other:?}"),
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        // Assert
        assert_eq!(claimed.load(Ordering::SeqCst), 1);
        let events = repo.load_events(session_id).await.unwrap();
        let session = reconstitute(session_id, &events).unwrap();
        let held: Vec<_> = session
            .slots()
            .iter()
            .filter(|s| s.occupant.is_some())
            .collect();
        assert_eq!(held.len(), 1);
    }

    #[tokio::test]
    async fn test_handle_close_session_blocks_further_toggles() {
        // Arrange
        let repo = InMemoryEventRepository::new();
        let session_id = open(&repo, &["Tank"], None).await;
        let clock = FixedClock(fixed_now());
        let close = CloseSession {
            correlation_id: Uuid::new_v4(),
            session_id,
            closed_by: UserId::from("1"),
        };

        // Act
        let closed = handle_close_session(&close, &clock, &repo).await.unwrap();
        let toggled = handle_toggle_slot(&toggle(session_id, 0, "2"), &clock, &registry(), &repo).await;
        let closed_again = handle_close_session(&close, &clock, &repo).await;

        // Assert
        assert_eq!(closed.summary.state, SessionState::Closed);
        assert_eq!(closed.stored_events[0].event_type, SESSION_CLOSED_EVENT_TYPE);
        assert!(matches!(toggled, Err(DomainError::SessionClosed(_))));
        assert!(matches!(closed_again, Err(DomainError::SessionClosed(_))));
    }

    #[tokio::test]
    async fn test_handle_close_session_returns_not_found_for_unknown_session() {
        let command = CloseSession {
            correlation_id: Uuid::new_v4(),
            session_id: Uuid::new_v4(),
            closed_by: UserId::from("1"),
        };

        let result =
            handle_close_session(&command, &FixedClock(fixed_now()), &EmptyEventRepository).await;

        assert!(matches!(result, Err(DomainError::SessionNotFound(_))));
    }

    /// Counts stream loads on top of an in-memory store.
    struct CountingLoadsRepository {
        inner: InMemoryEventRepository,
        loads: AtomicUsize,
    }

    #[async_trait]
    impl EventRepository for CountingLoadsRepository {
        async fn load_events(&self, aggregate_id: Uuid) -> Result<Vec<StoredEvent>, DomainError> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            self.inner.load_events(aggregate_id).await
        }

        async fn append_events(
            &self,
            aggregate_id: Uuid,
            expected_version: i64,
            events: &[StoredEvent],
        ) -> Result<(), DomainError> {
            self.inner
                .append_events(aggregate_id, expected_version, events)
                .await
        }

        async fn open_aggregate_ids(
            &self,
            opened_event_type: &str,
            closed_event_type: &str,
        ) -> Result<Vec<Uuid>, DomainError> {
            self.inner
                .open_aggregate_ids(opened_event_type, closed_event_type)
                .await
        }

        async fn evict_closed_before(
            &self,
            closed_event_type: &str,
            cutoff: DateTime<Utc>,
        ) -> Result<usize, DomainError> {
            self.inner.evict_closed_before(closed_event_type, cutoff).await
        }
    }

    fn sweep(retention: Duration) -> SweepExpiredSessions {
        SweepExpiredSessions {
            correlation_id: Uuid::new_v4(),
            retention,
        }
    }

    #[tokio::test]
    async fn test_handle_sweep_expired_sessions_closes_only_due_sessions() {
        // Arrange
        let repo = InMemoryEventRepository::new();
        let short = open(&repo, &["Tank"], Some(Duration::hours(1))).await;
        let long = open(&repo, &["Tank"], Some(Duration::hours(12))).await;
        let unbounded = open(&repo, &["Tank"], None).await;
        let clock = FixedClock(fixed_now() + Duration::hours(2));
        let command = sweep(Duration::days(1));

        // Act
        let first = handle_sweep_expired_sessions(&command, &clock, &repo)
            .await
            .unwrap();
        let second = handle_sweep_expired_sessions(&command, &clock, &repo)
            .await
            .unwrap();

        // Assert
        assert_eq!(first.expired, vec![short]);
        assert_eq!(first.evicted, 0);
        assert!(second.expired.is_empty());
        assert_eq!(repo.load_events(long).await.unwrap().len(), 1);
        assert_eq!(repo.load_events(unbounded).await.unwrap().len(), 1);
        assert_eq!(repo.load_events(short).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_handle_sweep_expired_sessions_does_not_reload_closed_sessions() {
        // Arrange
        let repo = CountingLoadsRepository {
            inner: InMemoryEventRepository::new(),
            loads: AtomicUsize::new(0),
        };
        let short = open(&repo.inner, &["Tank"], Some(Duration::hours(1))).await;
        open(&repo.inner, &["Tank"], Some(Duration::hours(12))).await;
        let manual = open(&repo.inner, &["Tank"], None).await;
        let clock = FixedClock(fixed_now() + Duration::hours(2));
        handle_close_session(
            &CloseSession {
                correlation_id: Uuid::new_v4(),
                session_id: manual,
                closed_by: UserId::from("1"),
            },
            &clock,
            &repo.inner,
        )
        .await
        .unwrap();
        let command = sweep(Duration::days(1));

        // Act
        let first = handle_sweep_expired_sessions(&command, &clock, &repo)
            .await
            .unwrap();
        let loads_after_first = repo.loads.swap(0, Ordering::SeqCst);
        handle_sweep_expired_sessions(&command, &clock, &repo)
            .await
            .unwrap();
        let loads_after_second = repo.loads.load(Ordering::SeqCst);

        // Assert
        assert_eq!(first.expired, vec![short]);
        assert_eq!(loads_after_first, 2);
        assert_eq!(loads_after_second, 1);
    }

    #[tokio::test]
    async fn test_handle_sweep_expired_sessions_evicts_sessions_past_retention() {
        // Arrange
        let repo = InMemoryEventRepository::new();
        let short = open(&repo, &["Tank"], Some(Duration::hours(1))).await;
        let long = open(&repo, &["Tank"], Some(Duration::hours(12))).await;
        let retention = sweep(Duration::hours(1));

        // Act
        let at_two_hours = handle_sweep_expired_sessions(
            &retention,
            &FixedClock(fixed_now() + Duration::hours(2)),
            &repo,
        )
        .await
        .unwrap();
        let at_four_hours = handle_sweep_expired_sessions(
            &retention,
            &FixedClock(fixed_now() + Duration::hours(4)),
            &repo,
        )
        .await
        .unwrap();

        // Assert
        assert_eq!(at_two_hours.expired, vec![short]);
        assert_eq!(at_two_hours.evicted, 0);
        assert!(at_four_hours.expired.is_empty());
        assert_eq!(at_four_hours.evicted, 1);
        assert!(repo.load_events(short).await.unwrap().is_empty());
        assert_eq!(repo.load_events(long).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_handle_sweep_expired_sessions_skips_undecodable_stream() {
        // Arrange
        let repo = InMemoryEventRepository::new();
        let corrupt = Uuid::new_v4();
        repo.append_events(
            corrupt,
            0,
            &[StoredEvent {
                event_id: Uuid::new_v4(),
                aggregate_id: corrupt,
                event_type: SESSION_OPENED_EVENT_TYPE.to_owned(),
                payload: serde_json::json!({ "unexpected": true }),
                sequence_number: 1,
                correlation_id: Uuid::new_v4(),
                causation_id: Uuid::new_v4(),
                occurred_at: fixed_now(),
            }],
        )
        .await
        .unwrap();
        let due = open(&repo, &["Tank"], Some(Duration::hours(1))).await;
        let clock = FixedClock(fixed_now() + Duration::hours(2));

        // Act
        let report = handle_sweep_expired_sessions(&sweep(Duration::days(1)), &clock, &repo)
            .await
            .unwrap();

        // Assert
        assert_eq!(report.expired, vec![due]);
        assert_eq!(repo.load_events(corrupt).await.unwrap().len(), 1);
    }
}
