//! Routes for player registration.

use axum::extract::{Path, State};
use axum::{Json, Router, routing::get};
use serde::Deserialize;
use tracing::{info, instrument};
use uuid::Uuid;

use warband_core::registry::{Profile, UserId};
use warband_registry::application::{command_handlers, query_handlers};
use warband_registry::domain::commands;

use crate::error::ApiError;
use crate::state::AppState;

/// Request body for PUT /{user_id}.
#[derive(Debug, Deserialize)]
pub struct RegisterProfileRequest {
    /// Platform display name.
    #[serde(default)]
    pub display_name: String,
    /// Guild tag.
    pub group_tag: String,
    /// Character name.
    pub in_game_name: String,
}

pub(crate) async fn register(
    state: &AppState,
    user_id: UserId,
    request: RegisterProfileRequest,
) -> Result<Profile, ApiError> {
    let command = commands::RegisterProfile {
        correlation_id: Uuid::new_v4(),
        user_id,
        display_name: request.display_name,
        group_tag: request.group_tag,
        in_game_name: request.in_game_name,
    };

    info!(correlation_id = %command.correlation_id, "handling register_profile command");

    Ok(command_handlers::handle_register_profile(
        &command,
        state.clock.as_ref(),
        &*state.profile_registry,
    )
    .await?)
}

/// PUT /{user_id}
#[instrument(skip(state, request))]
async fn put_profile(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(request): Json<RegisterProfileRequest>,
) -> Result<Json<Profile>, ApiError> {
    let profile = register(&state, UserId::new(user_id), request).await?;
    Ok(Json(profile))
}

/// GET /{user_id}
#[instrument(skip(state))]
async fn get_profile(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Profile>, ApiError> {
    let profile =
        query_handlers::get_profile(&UserId::new(user_id), &*state.profile_registry).await?;
    Ok(Json(profile))
}

/// Returns the router for the registration context.
pub fn router() -> Router<AppState> {
    Router::new().route("/{user_id}", get(get_profile).put(put_profile))
}
