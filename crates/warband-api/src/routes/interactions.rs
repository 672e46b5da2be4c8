//! Chat command endpoint.
//!
//! Decodes an [`InteractionCommand`] and dispatches it to the same typed
//! operations the REST routes use.

use axum::extract::State;
use axum::{Json, Router, routing::post};
use tracing::instrument;
use uuid::Uuid;

use warband_composition::application::query_handlers;
use warband_core::registry::Actor;
use warband_settlement::domain::commands::SettleLoot;

use crate::error::ApiError;
use crate::interaction::{InteractionCommand, InteractionReply, SlotToken, parse_mentions};
use crate::routes::profiles::{self, RegisterProfileRequest};
use crate::routes::settlements::{forward_to_ledger, settle};
use crate::routes::signups::{close_session, open_session, slot_action, toggle_slot};
use crate::state::AppState;

async fn dispatch(
    state: &AppState,
    command: InteractionCommand,
) -> Result<InteractionReply, ApiError> {
    match command {
        InteractionCommand::Register {
            user_id,
            display_name,
            guild,
            in_game_name,
        } => {
            let request = RegisterProfileRequest {
                display_name,
                group_tag: guild,
                in_game_name,
            };
            let profile = profiles::register(state, user_id, request).await?;
            Ok(InteractionReply::Registered { profile })
        }
        InteractionCommand::CompList => {
            let names =
                query_handlers::list_composition_names(&*state.composition_catalog).await?;
            Ok(InteractionReply::Compositions { names })
        }
        InteractionCommand::Signup {
            user_id,
            composition,
        } => {
            let result = open_session(state, composition, user_id, state.session_ttl).await?;
            let buttons = SlotToken::for_session(result.aggregate_id, result.summary.total_slots)
                .iter()
                .map(ToString::to_string)
                .collect();
            Ok(InteractionReply::SignupOpened {
                summary: result.summary,
                buttons,
            })
        }
        InteractionCommand::SignupButton {
            user_id,
            display_name,
            custom_id,
        } => {
            let token: SlotToken = custom_id.parse()?;
            let actor = Actor {
                user_id,
                display_name,
            };
            let result = toggle_slot(state, token.session_id, token.slot_index, actor).await?;
            let (action, slot_index) = slot_action(result.outcome);
            Ok(InteractionReply::SlotToggled {
                action,
                slot_index,
                summary: result.summary,
            })
        }
        InteractionCommand::CloseSignup {
            user_id,
            session_id,
        } => {
            let result = close_session(state, session_id, user_id).await?;
            Ok(InteractionReply::SignupClosed {
                summary: result.summary,
            })
        }
        InteractionCommand::Lootsplit {
            content_type,
            users,
            caller,
            total_loot,
            repair_fees,
        } => {
            let command = SettleLoot {
                correlation_id: Uuid::new_v4(),
                content_type,
                participant_ids: parse_mentions(&users)?,
                caller_id: parse_mentions(&caller)?.into_iter().next(),
                total_loot,
                repair_fees,
                caller_fee_rate: state.caller_fee_rate,
            };
            let settlement = settle(state, command).await?;
            let reply = InteractionReply::LootSplit {
                settlement: settlement.clone(),
            };
            forward_to_ledger(state, &settlement);
            Ok(reply)
        }
    }
}

/// POST /
#[instrument(skip(state, command), fields(command = command.name()))]
async fn handle_interaction(
    State(state): State<AppState>,
    Json(command): Json<InteractionCommand>,
) -> Result<Json<InteractionReply>, ApiError> {
    let reply = dispatch(&state, command).await?;
    Ok(Json(reply))
}

/// Returns the router for chat commands.
pub fn router() -> Router<AppState> {
    Router::new().route("/", post(handle_interaction))
}
