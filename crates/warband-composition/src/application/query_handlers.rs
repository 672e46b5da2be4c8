//! Query handlers for the composition context.

use serde::Serialize;
use uuid::Uuid;
use warband_core::catalog::{CompositionCatalog, CompositionTemplate};
use warband_core::error::DomainError;
use warband_core::registry::UserId;
use warband_core::repository::EventRepository;

use crate::application::command_handlers::load_draft;
use crate::domain::aggregates::{CompositionDraft, DraftStatus};

/// Read-only view of a composition draft.
#[derive(Debug, Clone, Serialize)]
pub struct DraftView {
    /// The draft identifier.
    pub draft_id: Uuid,
    /// Composition name.
    pub name: String,
    /// Role labels in order.
    pub roles: Vec<String>,
    /// The author.
    pub created_by: Option<UserId>,
    /// Lifecycle state.
    pub status: DraftStatus,
    /// Current version (event count).
    pub version: i64,
}

pub(crate) fn view(draft: &CompositionDraft) -> DraftView {
    DraftView {
        draft_id: draft.id,
        name: draft.name.clone(),
        roles: draft.roles.clone(),
        created_by: draft.created_by.clone(),
        status: draft.status,
        version: draft.version,
    }
}

/// Retrieves a draft by its identifier.
///
/// # Errors
///
/// Returns `DomainError::AggregateNotFound` if no events exist for the ID.
/// Returns `DomainError::Infrastructure` if event loading or deserialization
/// fails.
pub async fn get_draft(
    draft_id: Uuid,
    repo: &dyn EventRepository,
) -> Result<DraftView, DomainError> {
    let draft = load_draft(draft_id, repo).await?;
    Ok(view(&draft))
}

/// Finds a published template by case-insensitive name.
///
/// # Errors
///
/// Returns `DomainError::CompositionNotFound` if nothing matches, or a
/// catalog error.
pub async fn find_composition(
    name: &str,
    catalog: &dyn CompositionCatalog,
) -> Result<CompositionTemplate, DomainError> {
    let name = name.trim();
    catalog
        .find_by_name(name)
        .await?
        .ok_or_else(|| DomainError::CompositionNotFound(name.to_owned()))
}

/// Lists distinct published template names in ascending order.
///
/// # Errors
///
/// Returns a catalog error if the listing fails.
pub async fn list_composition_names(
    catalog: &dyn CompositionCatalog,
) -> Result<Vec<String>, DomainError> {
    catalog.list_names().await
}
