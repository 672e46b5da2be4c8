//! Periodic closing of expired signup sessions and eviction of old closed
//! ones.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use uuid::Uuid;
use warband_core::error::DomainError;
use warband_signup::application::command_handlers::{SweepReport, handle_sweep_expired_sessions};
use warband_signup::domain::commands::SweepExpiredSessions;

use crate::state::AppState;

/// Closes every open session past its expiry and evicts sessions closed for
/// longer than the configured retention.
///
/// # Errors
///
/// Returns the repository error that stopped the sweep.
pub async fn sweep_once(state: &AppState) -> Result<SweepReport, DomainError> {
    let command = SweepExpiredSessions {
        correlation_id: Uuid::new_v4(),
        retention: state.session_retention,
    };
    handle_sweep_expired_sessions(&command, state.clock.as_ref(), &*state.event_repository).await
}

/// Runs [`sweep_once`] every `every` until the task is aborted.
pub fn spawn(state: AppState, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            match sweep_once(&state).await {
                Ok(report) if report == SweepReport::default() => {
                    tracing::debug!("nothing to sweep");
                }
                Ok(report) => tracing::info!(
                    expired = report.expired.len(),
                    evicted = report.evicted,
                    "session sweep finished"
                ),
                Err(e) => tracing::error!(error = %e, "session sweep failed"),
            }
        }
    })
}
