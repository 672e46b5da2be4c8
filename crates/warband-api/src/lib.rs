//! Warband API — HTTP surface for signups, settlements and compositions.
//!
//! The binary in `main.rs` wires configuration, telemetry and storage; this
//! library exposes the router so tests can drive it in-process.

pub mod config;
pub mod error;
pub mod interaction;
pub mod routes;
pub mod state;
pub mod sweep;
pub mod telemetry;

use axum::Router;

use crate::state::AppState;

/// Builds the application router for `state`.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(routes::health::router())
        .nest("/api/v1/compositions", routes::compositions::router())
        .nest("/api/v1/signups", routes::signups::router())
        .nest("/api/v1/settlements", routes::settlements::router())
        .nest("/api/v1/profiles", routes::profiles::router())
        .nest("/api/v1/interactions", routes::interactions::router())
        .with_state(state)
}
