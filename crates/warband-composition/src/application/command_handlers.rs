//! Command handlers for the composition context.
//!
//! This module contains application-level command handler functions that
//! orchestrate domain logic: load aggregate, execute command, persist events.

use uuid::Uuid;
use warband_core::aggregate::AggregateRoot;
use warband_core::catalog::CompositionCatalog;
use warband_core::clock::Clock;
use warband_core::error::DomainError;
use warband_core::event::{DomainEvent, EventMetadata, decode_payload};
use warband_core::repository::{EventRepository, StoredEvent};

use crate::application::query_handlers::{DraftView, view};
use crate::domain::aggregates::CompositionDraft;
use crate::domain::commands::{AddRole, CancelDraft, PublishDraft, StartDraft};
use crate::domain::events::{CompositionEvent, CompositionEventKind};

/// Result of a successfully handled command.
#[derive(Debug)]
pub struct DraftCommandResult {
    /// The draft affected or created by the command.
    pub aggregate_id: Uuid,
    /// The draft as it stands after the command.
    pub draft: DraftView,
    /// The stored events produced and persisted.
    pub stored_events: Vec<StoredEvent>,
}

/// Reconstitutes a `CompositionDraft` from stored events.
///
/// # Errors
///
/// Returns `DomainError::Infrastructure` if event deserialization fails.
pub(crate) fn reconstitute(
    draft_id: Uuid,
    existing_events: &[StoredEvent],
) -> Result<CompositionDraft, DomainError> {
    let mut draft = CompositionDraft::new(draft_id);
    for stored in existing_events {
        let kind: CompositionEventKind = decode_payload(stored)?;
        let event = CompositionEvent {
            metadata: EventMetadata::from_stored(stored),
            kind,
        };
        draft.apply(&event);
    }
    Ok(draft)
}

pub(crate) async fn load_draft(
    draft_id: Uuid,
    repo: &dyn EventRepository,
) -> Result<CompositionDraft, DomainError> {
    let existing_events = repo.load_events(draft_id).await?;
    if existing_events.is_empty() {
        return Err(DomainError::AggregateNotFound(draft_id));
    }
    reconstitute(draft_id, &existing_events)
}

async fn persist(
    mut draft: CompositionDraft,
    repo: &dyn EventRepository,
) -> Result<DraftCommandResult, DomainError> {
    let stored_events: Vec<StoredEvent> = draft
        .uncommitted_events()
        .iter()
        .map(DomainEvent::to_stored)
        .collect::<Result<_, _>>()?;

    repo.append_events(draft.id, draft.version(), &stored_events)
        .await?;
    draft.commit();

    Ok(DraftCommandResult {
        aggregate_id: draft.id,
        draft: view(&draft),
        stored_events,
    })
}

/// Handles the `StartDraft` command: creates a new draft and persists the
/// resulting event.
///
/// # Errors
///
/// Returns `DomainError::Validation` for an invalid name, or a repository
/// error.
pub async fn handle_start_draft(
    command: &StartDraft,
    clock: &dyn Clock,
    repo: &dyn EventRepository,
) -> Result<DraftCommandResult, DomainError> {
    let mut draft = CompositionDraft::new(Uuid::new_v4());
    draft.start(
        &command.name,
        command.created_by.clone(),
        command.correlation_id,
        clock,
    )?;
    persist(draft, repo).await
}

/// Handles the `AddRole` command.
///
/// # Errors
///
/// Returns `DomainError::AggregateNotFound` if the draft has no events,
/// `DomainError::Validation` if the aggregate rejects the role, or a
/// repository error.
pub async fn handle_add_role(
    command: &AddRole,
    clock: &dyn Clock,
    repo: &dyn EventRepository,
) -> Result<DraftCommandResult, DomainError> {
    let mut draft = load_draft(command.draft_id, repo).await?;
    draft.add_role(
        &command.role_label,
        &command.actor,
        command.correlation_id,
        clock,
    )?;
    persist(draft, repo).await
}

/// Handles the `PublishDraft` command: records the draft as published, then
/// inserts the template into the catalog.
///
/// A name already in the catalog is rejected before anything is written, and
/// a lost append race leaves the catalog untouched. If another publisher
/// takes the name between the append and the insert, the draft is reopened
/// so its author can rename and publish again.
///
/// # Errors
///
/// Returns `DomainError::AggregateNotFound` if the draft has no events,
/// `DomainError::Validation` if the draft cannot be published or the name is
/// already in the catalog, or a repository error.
pub async fn handle_publish_draft(
    command: &PublishDraft,
    clock: &dyn Clock,
    catalog: &dyn CompositionCatalog,
    repo: &dyn EventRepository,
) -> Result<DraftCommandResult, DomainError> {
    let mut draft = load_draft(command.draft_id, repo).await?;
    let template = draft.publish(&command.actor, command.correlation_id, clock)?;
    let name = template.name.clone();
    let roles = template.role_slots.len();

    if catalog.list_names().await?.contains(&name) {
        return Err(name_taken(&name));
    }

    let result = persist(draft, repo).await?;

    if let Err(insert_error) = catalog.insert(template).await {
        tracing::warn!(
            draft_id = %command.draft_id,
            %name,
            error = %insert_error,
            "catalog refused published composition, reopening draft"
        );
        reopen_draft(command, &insert_error, clock, repo).await;
        return Err(insert_error);
    }

    tracing::info!(draft_id = %command.draft_id, %name, roles, "composition published");
    Ok(result)
}

fn name_taken(name: &str) -> DomainError {
    DomainError::Validation(format!("a composition named {name:?} already exists"))
}

async fn reopen_draft(
    command: &PublishDraft,
    cause: &DomainError,
    clock: &dyn Clock,
    repo: &dyn EventRepository,
) {
    let reopened = async {
        let mut draft = load_draft(command.draft_id, repo).await?;
        draft.reopen(&cause.to_string(), command.correlation_id, clock)?;
        persist(draft, repo).await
    }
    .await;

    if let Err(e) = reopened {
        tracing::error!(
            draft_id = %command.draft_id,
            error = %e,
            "failed to reopen draft after catalog insert failed"
        );
    }
}

/// Handles the `CancelDraft` command.
///
/// # Errors
///
/// Returns `DomainError::AggregateNotFound` if the draft has no events,
/// `DomainError::Validation` if the draft is finished or the actor is not the
/// author, or a repository error.
pub async fn handle_cancel_draft(
    command: &CancelDraft,
    clock: &dyn Clock,
    repo: &dyn EventRepository,
) -> Result<DraftCommandResult, DomainError> {
    let mut draft = load_draft(command.draft_id, repo).await?;
    draft.cancel(&command.actor, command.correlation_id, clock)?;
    persist(draft, repo).await
}
