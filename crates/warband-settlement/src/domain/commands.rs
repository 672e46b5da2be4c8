//! Commands for the settlement context.

use uuid::Uuid;
use warband_core::command::Command;
use warband_core::registry::UserId;

/// Command to split a loot total among the mentioned participants.
///
/// Fields arrive as the invoker typed them; the handler validates them in a
/// fixed order before any registry lookup.
#[derive(Debug, Clone)]
pub struct SettleLoot {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// Raw content type label.
    pub content_type: String,
    /// Mentioned participants in mention order; may contain duplicates.
    pub participant_ids: Vec<UserId>,
    /// The organizer, if one was mentioned.
    pub caller_id: Option<UserId>,
    /// Gross loot in silver.
    pub total_loot: i64,
    /// Repair costs in silver.
    pub repair_fees: i64,
    /// Fraction of post-repair loot paid to the caller.
    pub caller_fee_rate: f64,
}

impl Command for SettleLoot {
    fn command_type(&self) -> &'static str {
        "settlement.settle_loot"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn issued_by(&self) -> Option<&UserId> {
        self.caller_id.as_ref()
    }
}
