//! Routes for the signup session context.

use axum::extract::{Path, State};
use axum::{
    Json, Router,
    routing::{get, post},
};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use warband_core::registry::{Actor, UserId};
use warband_signup::application::command_handlers::{
    self, SignupCommandResult, ToggleSlotResult,
};
use warband_signup::application::query_handlers::{self, SessionSummary};
use warband_signup::domain::aggregates::{ToggleOutcome, session_ttl_from_secs};
use warband_signup::domain::commands;

use crate::error::ApiError;
use crate::interaction::SlotAction;
use crate::state::AppState;

/// Request body for POST /.
#[derive(Debug, Deserialize)]
pub struct OpenSessionRequest {
    /// Template name, matched case-insensitively.
    pub composition_name: String,
    /// User opening the session.
    pub created_by: UserId,
    /// Session lifetime in seconds; the configured default when absent.
    #[serde(default)]
    pub ttl_secs: Option<i64>,
}

/// Request body for POST /{session_id}/toggle.
#[derive(Debug, Deserialize)]
pub struct ToggleSlotRequest {
    /// Zero-based slot position.
    pub slot_index: usize,
    /// The player pressing the slot.
    pub user_id: UserId,
    /// Platform display name.
    #[serde(default)]
    pub display_name: String,
}

/// Request body for POST /{session_id}/close.
#[derive(Debug, Deserialize)]
pub struct CloseSessionRequest {
    /// User closing the session.
    pub closed_by: UserId,
}

/// Response body returned after a session command is successfully handled.
#[derive(Debug, Serialize)]
pub struct SessionCommandResponse {
    /// The session affected.
    pub aggregate_id: Uuid,
    /// The session after the command.
    pub summary: SessionSummary,
    /// IDs of the domain events produced and persisted.
    pub event_ids: Vec<Uuid>,
}

impl From<SignupCommandResult> for SessionCommandResponse {
    fn from(result: SignupCommandResult) -> Self {
        Self {
            aggregate_id: result.aggregate_id,
            summary: result.summary,
            event_ids: result.stored_events.iter().map(|e| e.event_id).collect(),
        }
    }
}

/// Response body for POST /{session_id}/toggle.
#[derive(Debug, Serialize)]
pub struct ToggleSlotResponse {
    /// What happened to the slot.
    pub action: SlotAction,
    /// The toggled slot.
    pub slot_index: usize,
    /// The session after the toggle.
    pub summary: SessionSummary,
    /// IDs of the domain events produced and persisted.
    pub event_ids: Vec<Uuid>,
}

pub(crate) fn slot_action(outcome: ToggleOutcome) -> (SlotAction, usize) {
    match outcome {
        ToggleOutcome::Claimed { slot_index } => (SlotAction::Claimed, slot_index),
        ToggleOutcome::Released { slot_index } => (SlotAction::Released, slot_index),
    }
}

pub(crate) async fn open_session(
    state: &AppState,
    composition_name: String,
    created_by: UserId,
    ttl: Option<Duration>,
) -> Result<SignupCommandResult, ApiError> {
    let command = commands::OpenSession {
        correlation_id: Uuid::new_v4(),
        composition_name,
        created_by,
        ttl,
    };

    info!(correlation_id = %command.correlation_id, "handling open_session command");

    Ok(command_handlers::handle_open_session(
        &command,
        state.clock.as_ref(),
        &*state.composition_catalog,
        &*state.event_repository,
    )
    .await?)
}

pub(crate) async fn toggle_slot(
    state: &AppState,
    session_id: Uuid,
    slot_index: usize,
    actor: Actor,
) -> Result<ToggleSlotResult, ApiError> {
    let command = commands::ToggleSlot {
        correlation_id: Uuid::new_v4(),
        session_id,
        slot_index,
        actor,
    };

    info!(correlation_id = %command.correlation_id, "handling toggle_slot command");

    Ok(command_handlers::handle_toggle_slot(
        &command,
        state.clock.as_ref(),
        &*state.profile_registry,
        &*state.event_repository,
    )
    .await?)
}

pub(crate) async fn close_session(
    state: &AppState,
    session_id: Uuid,
    closed_by: UserId,
) -> Result<SignupCommandResult, ApiError> {
    let command = commands::CloseSession {
        correlation_id: Uuid::new_v4(),
        session_id,
        closed_by,
    };

    info!(correlation_id = %command.correlation_id, "handling close_session command");

    Ok(command_handlers::handle_close_session(
        &command,
        state.clock.as_ref(),
        &*state.event_repository,
    )
    .await?)
}

/// POST /
#[instrument(skip(state, request), fields(composition = %request.composition_name))]
async fn create_session(
    State(state): State<AppState>,
    Json(request): Json<OpenSessionRequest>,
) -> Result<Json<SessionCommandResponse>, ApiError> {
    let ttl = match request.ttl_secs {
        None => state.session_ttl,
        Some(secs) => Some(session_ttl_from_secs(secs)?),
    };

    let result = open_session(&state, request.composition_name, request.created_by, ttl).await?;
    Ok(Json(result.into()))
}

/// GET /{session_id}
#[instrument(skip(state))]
async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<SessionSummary>, ApiError> {
    let summary = query_handlers::get_session_summary(
        session_id,
        state.clock.as_ref(),
        &*state.event_repository,
    )
    .await?;
    Ok(Json(summary))
}

/// POST /{session_id}/toggle
#[instrument(
    skip(state, request),
    fields(slot_index = request.slot_index, user_id = %request.user_id)
)]
async fn toggle(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(request): Json<ToggleSlotRequest>,
) -> Result<Json<ToggleSlotResponse>, ApiError> {
    let actor = Actor {
        user_id: request.user_id,
        display_name: request.display_name,
    };
    let result = toggle_slot(&state, session_id, request.slot_index, actor).await?;

    let (action, slot_index) = slot_action(result.outcome);
    Ok(Json(ToggleSlotResponse {
        action,
        slot_index,
        summary: result.summary,
        event_ids: result.stored_events.iter().map(|e| e.event_id).collect(),
    }))
}

/// POST /{session_id}/close
#[instrument(skip(state, request), fields(closed_by = %request.closed_by))]
async fn close(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(request): Json<CloseSessionRequest>,
) -> Result<Json<SessionCommandResponse>, ApiError> {
    let result = close_session(&state, session_id, request.closed_by).await?;
    Ok(Json(result.into()))
}

/// Returns the router for the signup context.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_session))
        .route("/{session_id}", get(get_session))
        .route("/{session_id}/toggle", post(toggle))
        .route("/{session_id}/close", post(close))
}
