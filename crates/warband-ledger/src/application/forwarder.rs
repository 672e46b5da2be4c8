//! Detached, at-most-once forwarding of settlements.

use std::sync::Arc;

use tokio::task::JoinHandle;
use warband_settlement::domain::settlement::Settlement;

use crate::domain::payload::{ForwardingTarget, build_payload};
use crate::transport::LedgerTransport;

/// Relays the target guild's share of each settlement to the ledger.
#[derive(Clone)]
pub struct LedgerForwarder {
    transport: Arc<dyn LedgerTransport>,
    target: ForwardingTarget,
}

impl std::fmt::Debug for LedgerForwarder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerForwarder")
            .field("target", &self.target)
            .finish_non_exhaustive()
    }
}

impl LedgerForwarder {
    /// Creates a forwarder for `target` over `transport`.
    #[must_use]
    pub fn new(transport: Arc<dyn LedgerTransport>, target: ForwardingTarget) -> Self {
        Self { transport, target }
    }

    /// Starts delivery on a background task and returns immediately.
    ///
    /// Nothing is spawned when the target guild has no participants. The
    /// outcome is only logged; callers may drop the handle.
    pub fn forward_detached(&self, settlement: &Settlement) -> Option<JoinHandle<()>> {
        let Some(payload) = build_payload(settlement, &self.target) else {
            tracing::info!(
                group_tag = %self.target.group_tag,
                "no participants in target group; skipping ledger forwarding"
            );
            return None;
        };

        let transport = Arc::clone(&self.transport);
        Some(tokio::spawn(async move {
            match transport.send(&payload).await {
                Ok(()) => tracing::info!(
                    target_id = %payload.target_id,
                    credited = payload.participants.len(),
                    total_loot = payload.total_loot,
                    "ledger ingest ok"
                ),
                Err(e) => tracing::error!(
                    target_id = %payload.target_id,
                    error = %e,
                    "ledger ingest failed"
                ),
            }
        }))
    }
}
