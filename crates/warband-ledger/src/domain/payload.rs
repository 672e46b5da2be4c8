//! Ledger wire payload.

use serde::{Deserialize, Serialize};
use warband_core::registry::UserId;
use warband_settlement::domain::settlement::{ContentType, Settlement};

/// Where filtered settlements are sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwardingTarget {
    /// Identifier the ledger books the settlement under.
    pub target_id: String,
    /// Only participants with this guild tag are forwarded.
    pub group_tag: String,
}

/// JSON body posted to the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerPayload {
    /// Ledger-side booking identifier.
    pub target_id: String,
    /// Content category of the settlement.
    pub content_type: ContentType,
    /// Silver owed to the target guild, not the settlement's gross loot.
    pub total_loot: i64,
    /// Repair fees of the whole settlement, unfiltered.
    pub repair_fees: i64,
    /// The caller fee in silver.
    pub explicit_caller_fee: i64,
    /// Rate the caller fee was computed with.
    pub caller_fee_rate: f64,
    /// The organizer, whatever guild they belong to.
    pub caller_id: UserId,
    /// Participants of the target guild, in mention order.
    pub participants: Vec<UserId>,
}

/// Builds the payload for `target`, or `None` when nobody in the settlement
/// belongs to the target guild.
///
/// The forwarded total is `per_person` times the number of matching
/// participants, plus the caller fee when the caller is in the target guild.
#[must_use]
#[allow(clippy::cast_possible_wrap)]
pub fn build_payload(settlement: &Settlement, target: &ForwardingTarget) -> Option<LedgerPayload> {
    let participants: Vec<UserId> = settlement
        .participants
        .iter()
        .filter(|p| p.group_tag == target.group_tag)
        .map(|p| p.user_id.clone())
        .collect();
    if participants.is_empty() {
        return None;
    }

    let mut total_loot = settlement.per_person * participants.len() as i64;
    if settlement.caller.group_tag == target.group_tag {
        total_loot += settlement.caller_fee;
    }

    Some(LedgerPayload {
        target_id: target.target_id.clone(),
        content_type: settlement.content_type,
        total_loot,
        repair_fees: settlement.repair_fees,
        explicit_caller_fee: settlement.caller_fee,
        caller_fee_rate: settlement.caller_fee_rate,
        caller_id: settlement.caller.user_id.clone(),
        participants,
    })
}
