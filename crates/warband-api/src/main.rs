//! Warband API server entry point.

use std::error::Error;
use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use warband_api::config::{AppConfig, LedgerConfig};
use warband_api::error::AppError;
use warband_api::state::AppState;
use warband_api::{app, sweep, telemetry};
use warband_composition::application::seed::seed_catalog;
use warband_core::clock::{Clock, SystemClock};
use warband_ledger::{ForwardingTarget, HttpLedgerTransport, LedgerForwarder};
use warband_store::{PgCompositionCatalog, PgEventRepository, PgProfileRegistry};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let config = AppConfig::from_env()?;
    let _telemetry = telemetry::init(config.otlp_endpoint.as_deref())?;

    tracing::info!("Starting Warband API server");

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let mut app_state = match &config.database_url {
        Some(database_url) => {
            let pool = PgPoolOptions::new()
                .max_connections(10)
                .connect(database_url)
                .await
                .map_err(AppError::from)?;
            sqlx::migrate!("../../migrations")
                .run(&pool)
                .await
                .map_err(AppError::from)?;
            AppState::new(
                clock,
                Arc::new(PgEventRepository::new(pool.clone())),
                Arc::new(PgProfileRegistry::new(pool.clone())),
                Arc::new(PgCompositionCatalog::new(pool)),
            )
        }
        None => {
            tracing::warn!("DATABASE_URL not set; using in-memory stores");
            AppState::in_memory(clock)
        }
    }
    .with_caller_fee_rate(config.caller_fee_rate)
    .with_session_ttl(Some(config.session_ttl))
    .with_session_retention(config.session_retention);

    if let Some(path) = &config.compositions_seed_file {
        let yaml = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| AppError::Config(format!("cannot read {}: {e}", path.display())))?;
        let inserted =
            seed_catalog(&yaml, app_state.clock.as_ref(), &*app_state.composition_catalog)
                .await
                .map_err(|e| AppError::Config(format!("invalid {}: {e}", path.display())))?;
        tracing::info!(inserted, file = %path.display(), "composition catalog seeded");
    }

    match &config.ledger {
        Some(ledger) => app_state = app_state.with_ledger(ledger_forwarder(ledger)?),
        None => tracing::warn!(
            "ledger forwarding disabled; set LEDGER_WEBHOOK_URL, LEDGER_WEBHOOK_SECRET and LEDGER_TARGET_GROUP to enable it"
        ),
    }

    let sweeper = sweep::spawn(app_state.clone(), config.sweep_interval);

    // TODO: restrict CORS origins once the chat gateway host is fixed.
    let router = app(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = config.bind_addr()?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(AppError::from)?;

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(AppError::from)?;

    sweeper.abort();
    tracing::info!("Warband API server stopped");
    Ok(())
}

fn ledger_forwarder(config: &LedgerConfig) -> Result<LedgerForwarder, AppError> {
    let transport = HttpLedgerTransport::new(
        config.webhook_url.clone(),
        config.webhook_secret.clone(),
        config.timeout,
    )
    .map_err(|e| AppError::Config(format!("cannot build ledger client: {e}")))?;

    tracing::info!(
        target_id = %config.target_id,
        group_tag = %config.target_group,
        "ledger forwarding enabled"
    );
    Ok(LedgerForwarder::new(
        Arc::new(transport),
        ForwardingTarget {
            target_id: config.target_id.clone(),
            group_tag: config.target_group.clone(),
        },
    ))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
