//! Routes for the composition catalog and authoring context.

use axum::extract::{Path, State};
use axum::{
    Json, Router,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use warband_composition::application::command_handlers::{self, DraftCommandResult};
use warband_composition::application::query_handlers::{self, DraftView};
use warband_composition::domain::commands;
use warband_core::catalog::CompositionTemplate;
use warband_core::registry::UserId;

use crate::error::ApiError;
use crate::state::AppState;

/// Request body for POST /drafts.
#[derive(Debug, Deserialize)]
pub struct StartDraftRequest {
    /// Composition name.
    pub name: String,
    /// The author.
    pub created_by: UserId,
}

/// Request body for POST /drafts/{draft_id}/roles.
#[derive(Debug, Deserialize)]
pub struct AddRoleRequest {
    /// Role label to append.
    pub role_label: String,
    /// User issuing the command.
    pub actor: UserId,
}

/// Request body for POST /drafts/{draft_id}/publish and /cancel.
#[derive(Debug, Deserialize)]
pub struct DraftActorRequest {
    /// User issuing the command.
    pub actor: UserId,
}

/// Response body returned after a draft command is successfully handled.
#[derive(Debug, Serialize)]
pub struct DraftCommandResponse {
    /// The draft affected.
    pub aggregate_id: Uuid,
    /// The draft after the command.
    pub draft: DraftView,
    /// IDs of the domain events produced and persisted.
    pub event_ids: Vec<Uuid>,
}

impl From<DraftCommandResult> for DraftCommandResponse {
    fn from(result: DraftCommandResult) -> Self {
        Self {
            aggregate_id: result.aggregate_id,
            draft: result.draft,
            event_ids: result.stored_events.iter().map(|e| e.event_id).collect(),
        }
    }
}

/// Response body for GET /.
#[derive(Debug, Serialize)]
pub struct CompositionListResponse {
    /// Published names in ascending order.
    pub names: Vec<String>,
}

/// GET /
#[instrument(skip(state))]
async fn list_compositions(
    State(state): State<AppState>,
) -> Result<Json<CompositionListResponse>, ApiError> {
    let names = query_handlers::list_composition_names(&*state.composition_catalog).await?;
    Ok(Json(CompositionListResponse { names }))
}

/// GET /{name}
#[instrument(skip(state))]
async fn get_composition(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<CompositionTemplate>, ApiError> {
    let template = query_handlers::find_composition(&name, &*state.composition_catalog).await?;
    Ok(Json(template))
}

/// POST /drafts
#[instrument(skip(state, request), fields(created_by = %request.created_by))]
async fn start_draft(
    State(state): State<AppState>,
    Json(request): Json<StartDraftRequest>,
) -> Result<Json<DraftCommandResponse>, ApiError> {
    let command = commands::StartDraft {
        correlation_id: Uuid::new_v4(),
        name: request.name,
        created_by: request.created_by,
    };

    info!(correlation_id = %command.correlation_id, "handling start_draft command");

    let result = command_handlers::handle_start_draft(
        &command,
        state.clock.as_ref(),
        &*state.event_repository,
    )
    .await?;

    Ok(Json(result.into()))
}

/// GET /drafts/{draft_id}
#[instrument(skip(state))]
async fn get_draft(
    State(state): State<AppState>,
    Path(draft_id): Path<Uuid>,
) -> Result<Json<DraftView>, ApiError> {
    let view = query_handlers::get_draft(draft_id, &*state.event_repository).await?;
    Ok(Json(view))
}

/// POST /drafts/{draft_id}/roles
#[instrument(skip(state, request), fields(actor = %request.actor))]
async fn add_role(
    State(state): State<AppState>,
    Path(draft_id): Path<Uuid>,
    Json(request): Json<AddRoleRequest>,
) -> Result<Json<DraftCommandResponse>, ApiError> {
    let command = commands::AddRole {
        correlation_id: Uuid::new_v4(),
        draft_id,
        role_label: request.role_label,
        actor: request.actor,
    };

    info!(correlation_id = %command.correlation_id, "handling add_role command");

    let result = command_handlers::handle_add_role(
        &command,
        state.clock.as_ref(),
        &*state.event_repository,
    )
    .await?;

    Ok(Json(result.into()))
}

/// POST /drafts/{draft_id}/publish
#[instrument(skip(state, request), fields(actor = %request.actor))]
async fn publish_draft(
    State(state): State<AppState>,
    Path(draft_id): Path<Uuid>,
    Json(request): Json<DraftActorRequest>,
) -> Result<Json<DraftCommandResponse>, ApiError> {
    let command = commands::PublishDraft {
        correlation_id: Uuid::new_v4(),
        draft_id,
        actor: request.actor,
    };

    info!(correlation_id = %command.correlation_id, "handling publish_draft command");

    let result = command_handlers::handle_publish_draft(
        &command,
        state.clock.as_ref(),
        &*state.composition_catalog,
        &*state.event_repository,
    )
    .await?;

    Ok(Json(result.into()))
}

/// POST /drafts/{draft_id}/cancel
#[instrument(skip(state, request), fields(actor = %request.actor))]
async fn cancel_draft(
    State(state): State<AppState>,
    Path(draft_id): Path<Uuid>,
    Json(request): Json<DraftActorRequest>,
) -> Result<Json<DraftCommandResponse>, ApiError> {
    let command = commands::CancelDraft {
        correlation_id: Uuid::new_v4(),
        draft_id,
        actor: request.actor,
    };

    info!(correlation_id = %command.correlation_id, "handling cancel_draft command");

    let result = command_handlers::handle_cancel_draft(
        &command,
        state.clock.as_ref(),
        &*state.event_repository,
    )
    .await?;

    Ok(Json(result.into()))
}

/// Returns the router for the composition context.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_compositions))
        .route("/{name}", get(get_composition))
        .route("/drafts", post(start_draft))
        .route("/drafts/{draft_id}", get(get_draft))
        .route("/drafts/{draft_id}/roles", post(add_role))
        .route("/drafts/{draft_id}/publish", post(publish_draft))
        .route("/drafts/{draft_id}/cancel", post(cancel_draft))
}
