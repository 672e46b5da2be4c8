//! Warband Store — persistence adapters.
//!
//! PostgreSQL adapters back production deployments; the in-memory adapters
//! serve local runs without a database and the test suites. Both honour the
//! same optimistic-concurrency contract on event streams.

pub mod memory;
pub mod pg_composition_catalog;
pub mod pg_event_repository;
pub mod pg_profile_registry;

pub use memory::{InMemoryCompositionCatalog, InMemoryEventRepository, InMemoryProfileRegistry};
pub use pg_composition_catalog::PgCompositionCatalog;
pub use pg_event_repository::PgEventRepository;
pub use pg_profile_registry::PgProfileRegistry;

/// Maps a `sqlx` failure onto the domain's persistence error.
pub(crate) fn infrastructure(err: &sqlx::Error) -> warband_core::error::DomainError {
    warband_core::error::DomainError::Infrastructure(err.to_string())
}
