//! Routes for the loot settlement context.

use std::collections::BTreeMap;

use axum::extract::State;
use axum::{Json, Router, routing::post};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use warband_core::registry::UserId;
use warband_settlement::application::command_handlers;
use warband_settlement::domain::commands;
use warband_settlement::domain::settlement::Settlement;

use crate::error::ApiError;
use crate::state::AppState;

/// Request body for POST /.
#[derive(Debug, Deserialize)]
pub struct SettleLootRequest {
    /// Content category: `Royals`, `HO` or `No Tax`.
    pub content_type: String,
    /// Participants in mention order.
    pub participant_ids: Vec<UserId>,
    /// The organizer.
    #[serde(default)]
    pub caller_id: Option<UserId>,
    /// Gross loot.
    pub total_loot: i64,
    /// Repair costs.
    #[serde(default)]
    pub repair_fees: i64,
    /// Caller fee rate; the configured default when absent.
    #[serde(default)]
    pub caller_fee_rate: Option<f64>,
}

/// Response body for POST /.
#[derive(Debug, Serialize)]
pub struct SettlementResponse {
    /// The computed split.
    #[serde(flatten)]
    pub settlement: Settlement,
    /// Payout per guild tag.
    pub per_group_totals: BTreeMap<String, i64>,
}

pub(crate) async fn settle(
    state: &AppState,
    command: commands::SettleLoot,
) -> Result<Settlement, ApiError> {
    info!(correlation_id = %command.correlation_id, "handling settle_loot command");

    Ok(command_handlers::handle_settle_loot(&command, &*state.profile_registry).await?)
}

/// Hands the settlement to the ledger forwarder, if one is configured.
///
/// Call this once the response value is built. Delivery runs on a detached
/// task, so it never delays the response, but it may start before the
/// response is written to the socket.
pub(crate) fn forward_to_ledger(state: &AppState, settlement: &Settlement) {
    if let Some(ledger) = &state.ledger {
        ledger.forward_detached(settlement);
    }
}

/// POST /
#[instrument(
    skip(state, request),
    fields(content_type = %request.content_type, participants = request.participant_ids.len())
)]
async fn settle_loot(
    State(state): State<AppState>,
    Json(request): Json<SettleLootRequest>,
) -> Result<Json<SettlementResponse>, ApiError> {
    let command = commands::SettleLoot {
        correlation_id: Uuid::new_v4(),
        content_type: request.content_type,
        participant_ids: request.participant_ids,
        caller_id: request.caller_id,
        total_loot: request.total_loot,
        repair_fees: request.repair_fees,
        caller_fee_rate: request.caller_fee_rate.unwrap_or(state.caller_fee_rate),
    };

    let settlement = settle(&state, command).await?;
    let response = Json(SettlementResponse {
        per_group_totals: settlement.per_group_totals(),
        settlement: settlement.clone(),
    });

    forward_to_ledger(&state, &settlement);
    Ok(response)
}

/// Returns the router for the settlement context.
pub fn router() -> Router<AppState> {
    Router::new().route("/", post(settle_loot))
}
