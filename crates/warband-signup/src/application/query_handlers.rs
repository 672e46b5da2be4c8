//! Query handlers for the signup context.
//!
//! Sessions are reconstituted from their event stream and projected into a
//! read-only summary used for rendering rosters.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;
use warband_core::clock::Clock;
use warband_core::error::DomainError;
use warband_core::registry::UserId;
use warband_core::repository::EventRepository;

use crate::application::command_handlers;
use crate::domain::aggregates::{SessionStatus, SignupSession};
use crate::domain::events::{CloseReason, Occupant};

/// Whether a session still takes signups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Accepting toggles.
    Open,
    /// Finalized by a user.
    Closed,
    /// Past its expiry, whether or not the sweep has run yet.
    Expired,
}

/// One slot in a session summary.
#[derive(Debug, Clone, Serialize)]
pub struct SlotView {
    /// Zero-based slot position.
    pub slot_index: usize,
    /// Role label.
    pub role_label: String,
    /// Current holder.
    pub occupant: Option<Occupant>,
}

/// Read-only view of a signup session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    /// The session identifier.
    pub session_id: Uuid,
    /// Source template name.
    pub template_name: String,
    /// User that opened the session.
    pub created_by: Option<UserId>,
    /// When the session was opened.
    pub opened_at: Option<DateTime<Utc>>,
    /// When the session stops accepting toggles.
    pub expires_at: Option<DateTime<Utc>>,
    /// Lifecycle state at query time.
    pub state: SessionState,
    /// Slots in template order.
    pub slots: Vec<SlotView>,
    /// Number of occupied slots.
    pub total_claimed: usize,
    /// Number of slots.
    pub total_slots: usize,
    /// Current version (event count).
    pub version: i64,
}

/// Projects a session into its summary as of `now`.
#[must_use]
pub fn summarize(session: &SignupSession, now: DateTime<Utc>) -> SessionSummary {
    let state = match session.status {
        SessionStatus::Closed(CloseReason::Manual) => SessionState::Closed,
        SessionStatus::Closed(CloseReason::Expired) => SessionState::Expired,
        SessionStatus::Open if session.is_closed_at(now) => SessionState::Expired,
        SessionStatus::Open => SessionState::Open,
    };
    let slots: Vec<SlotView> = session
        .slots()
        .iter()
        .enumerate()
        .map(|(slot_index, slot)| SlotView {
            slot_index,
            role_label: slot.role_label.clone(),
            occupant: slot.occupant.clone(),
        })
        .collect();

    SessionSummary {
        session_id: session.id,
        template_name: session.template_name.clone(),
        created_by: session.created_by.clone(),
        opened_at: session.opened_at,
        expires_at: session.expires_at,
        state,
        total_claimed: slots.iter().filter(|s| s.occupant.is_some()).count(),
        total_slots: slots.len(),
        slots,
        version: session.version,
    }
}

/// Retrieves the summary of a session by its identifier.
///
/// # Errors
///
/// Returns `DomainError::SessionNotFound` if no events exist for the ID.
/// Returns `DomainError::Infrastructure` if event loading or deserialization
/// fails.
pub async fn get_session_summary(
    session_id: Uuid,
    clock: &dyn Clock,
    repo: &dyn EventRepository,
) -> Result<SessionSummary, DomainError> {
    let stored_events = repo.load_events(session_id).await?;
    if stored_events.is_empty() {
        return Err(DomainError::SessionNotFound(session_id));
    }
    let session = command_handlers::reconstitute(session_id, &stored_events)?;
    Ok(summarize(&session, clock.now()))
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use uuid::Uuid;
    use warband_core::error::DomainError;
    use warband_core::repository::StoredEvent;
    use warband_test_support::{EmptyEventRepository, FixedClock, RecordingEventRepository, fixed_now};

    use super::*;
    use crate::domain::events::{
        SESSION_OPENED_EVENT_TYPE, SLOT_CLAIMED_EVENT_TYPE, SessionOpened, SignupEventKind,
        SlotClaimed,
    };

    fn stored(session_id: Uuid, sequence_number: i64, kind: &SignupEventKind) -> StoredEvent {
        let event_type = match kind {
            SignupEventKind::SessionOpened(_) => SESSION_OPENED_EVENT_TYPE,
            _ => SLOT_CLAIMED_EVENT_TYPE,
        };
        StoredEvent {
            event_id: Uuid::new_v4(),
            aggregate_id: session_id,
            event_type: event_type.to_owned(),
            payload: serde_json::to_value(kind).unwrap(),
            sequence_number,
            correlation_id: Uuid::new_v4(),
            causation_id: Uuid::new_v4(),
            occurred_at: fixed_now(),
        }
    }

    fn stream(session_id: Uuid) -> Vec<StoredEvent> {
        vec![
            stored(
                session_id,
                1,
                &SignupEventKind::SessionOpened(SessionOpened {
                    session_id,
                    template_name: "Castle Siege".to_owned(),
                    role_slots: vec!["Tank".to_owned(), "Healer".to_owned()],
                    created_by: UserId::from("1"),
                    expires_at: Some(fixed_now() + Duration::hours(1)),
                }),
            ),
            stored(
                session_id,
                2,
                &SignupEventKind::SlotClaimed(SlotClaimed {
                    session_id,
                    slot_index: 1,
                    occupant: Occupant {
                        user_id: UserId::from("2"),
                        display_name: "aldric".to_owned(),
                        in_game_name: "Aldric".to_owned(),
                        group_tag: "Phoenix Rebels".to_owned(),
                    },
                }),
            ),
        ]
    }

    #[tokio::test]
    async fn test_get_session_summary_projects_slots_and_counts() {
        // Arrange
        let session_id = Uuid::new_v4();
        let repo = RecordingEventRepository::new(stream(session_id));
        let clock = FixedClock(fixed_now());

        // Act
        let summary = get_session_summary(session_id, &clock, &repo).await.unwrap();

        // Assert
        assert_eq!(summary.session_id, session_id);
        assert_eq!(summary.template_name, "Castle Siege");
        assert_eq!(summary.state, SessionState::Open);
        assert_eq!(summary.total_slots, 2);
        assert_eq!(summary.total_claimed, 1);
        assert!(summary.slots[0].occupant.is_none());
        assert_eq!(
            summary.slots[1].occupant.as_ref().unwrap().in_game_name,
            "Aldric"
        );
        assert_eq!(summary.version, 2);
        assert!(repo.appended_events().is_empty());
    }

    #[tokio::test]
    async fn test_get_session_summary_reports_expired_before_sweep() {
        let session_id = Uuid::new_v4();
        let repo = RecordingEventRepository::new(stream(session_id));
        let clock = FixedClock(fixed_now() + Duration::hours(2));

        let summary = get_session_summary(session_id, &clock, &repo).await.unwrap();

        assert_eq!(summary.state, SessionState::Expired);
    }

    #[tokio::test]
    async fn test_get_session_summary_returns_not_found_when_no_events() {
        let session_id = Uuid::new_v4();
        let clock = FixedClock(fixed_now());

        let result = get_session_summary(session_id, &clock, &EmptyEventRepository).await;

        match result.unwrap_err() {
            DomainError::SessionNotFound(id) => assert_eq!(id, session_id),
            other => panic!("expected SessionNotFound, got {other:?}"),
        }
    }
}
