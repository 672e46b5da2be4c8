//! Shared application state.

use std::sync::Arc;

use chrono::Duration;
use warband_core::catalog::CompositionCatalog;
use warband_core::clock::Clock;
use warband_core::registry::ProfileRegistry;
use warband_core::repository::EventRepository;
use warband_ledger::LedgerForwarder;
use warband_store::{InMemoryCompositionCatalog, InMemoryEventRepository, InMemoryProfileRegistry};

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Clock for timestamps and session expiry.
    pub clock: Arc<dyn Clock>,
    /// Event store for signup sessions and composition drafts.
    pub event_repository: Arc<dyn EventRepository>,
    /// Player profiles.
    pub profile_registry: Arc<dyn ProfileRegistry>,
    /// Published composition templates.
    pub composition_catalog: Arc<dyn CompositionCatalog>,
    /// Ledger forwarding; `None` disables it.
    pub ledger: Option<LedgerForwarder>,
    /// Caller fee rate used when a request does not give one.
    pub caller_fee_rate: f64,
    /// Lifetime given to new signup sessions.
    pub session_ttl: Option<Duration>,
    /// How long closed sessions stay readable before the sweep evicts them.
    pub session_retention: Duration,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("ledger", &self.ledger)
            .field("caller_fee_rate", &self.caller_fee_rate)
            .field("session_ttl", &self.session_ttl)
            .field("session_retention", &self.session_retention)
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// Create new application state with forwarding disabled, no caller fee,
    /// a 12 hour session lifetime and a 24 hour retention of closed sessions.
    #[must_use]
    pub fn new(
        clock: Arc<dyn Clock>,
        event_repository: Arc<dyn EventRepository>,
        profile_registry: Arc<dyn ProfileRegistry>,
        composition_catalog: Arc<dyn CompositionCatalog>,
    ) -> Self {
        Self {
            clock,
            event_repository,
            profile_registry,
            composition_catalog,
            ledger: None,
            caller_fee_rate: 0.0,
            session_ttl: Some(Duration::hours(12)),
            session_retention: Duration::hours(24),
        }
    }

    /// State backed entirely by in-memory stores.
    #[must_use]
    pub fn in_memory(clock: Arc<dyn Clock>) -> Self {
        Self::new(
            clock,
            Arc::new(InMemoryEventRepository::new()),
            Arc::new(InMemoryProfileRegistry::new()),
            Arc::new(InMemoryCompositionCatalog::new()),
        )
    }

    /// Enables ledger forwarding.
    #[must_use]
    pub fn with_ledger(mut self, ledger: LedgerForwarder) -> Self {
        self.ledger = Some(ledger);
        self
    }

    /// Sets the default caller fee rate.
    #[must_use]
    pub fn with_caller_fee_rate(mut self, rate: f64) -> Self {
        self.caller_fee_rate = rate;
        self
    }

    /// Sets the lifetime of new sessions; `None` keeps them open until
    /// closed.
    #[must_use]
    pub fn with_session_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.session_ttl = ttl;
        self
    }

    /// Sets how long closed sessions are kept before eviction.
    #[must_use]
    pub fn with_session_retention(mut self, retention: Duration) -> Self {
        self.session_retention = retention;
        self
    }
}
