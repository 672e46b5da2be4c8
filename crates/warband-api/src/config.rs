//! Startup configuration read from the environment.

use std::fmt::Display;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use warband_signup::domain::aggregates::session_ttl_from_secs;

use crate::error::AppError;

/// Webhook settings for forwarding settlements to the guild ledger.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerConfig {
    /// Endpoint receiving the JSON payload.
    pub webhook_url: String,
    /// Shared secret sent in the `X-Webhook-Secret` header.
    pub webhook_secret: String,
    /// Identifier the ledger files entries under.
    pub target_id: String,
    /// Guild whose share is forwarded.
    pub target_group: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

/// Application configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    /// Interface to bind.
    pub host: String,
    /// Port to bind.
    pub port: u16,
    /// PostgreSQL URL; in-memory stores are used when unset.
    pub database_url: Option<String>,
    /// Default caller fee rate for settlements.
    pub caller_fee_rate: f64,
    /// Lifetime of a signup session.
    pub session_ttl: chrono::Duration,
    /// How often expired sessions are swept.
    pub sweep_interval: Duration,
    /// How long closed sessions are kept before the sweep evicts them.
    pub session_retention: chrono::Duration,
    /// Ledger forwarding, when fully configured.
    pub ledger: Option<LedgerConfig>,
    /// YAML file of compositions loaded into the catalog at startup.
    pub compositions_seed_file: Option<PathBuf>,
    /// OTLP collector endpoint for span export.
    pub otlp_endpoint: Option<String>,
}

const DEFAULT_SESSION_TTL_SECS: i64 = 12 * 60 * 60;
const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 300;
const DEFAULT_SESSION_RETENTION_SECS: i64 = 24 * 60 * 60;
const DEFAULT_LEDGER_TIMEOUT_SECS: u64 = 10;

impl AppConfig {
    /// Reads the configuration from process environment variables.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if a variable holds an invalid value.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through `lookup`. Blank values count as
    /// unset.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if a variable holds an invalid value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
        };

        let host = get("HOST").unwrap_or_else(|| "0.0.0.0".to_owned());
        let port: u16 = parse_or(get("PORT"), "PORT", 3000)?;

        let caller_fee_rate: f64 = parse_or(get("CALLER_FEE_RATE"), "CALLER_FEE_RATE", 0.0)?;
        if !caller_fee_rate.is_finite() || !(0.0..=1.0).contains(&caller_fee_rate) {
            return Err(AppError::Config(format!(
                "CALLER_FEE_RATE must be between 0 and 1, got {caller_fee_rate}"
            )));
        }

        let ttl_secs: i64 = parse_or(
            get("SIGNUP_SESSION_TTL_SECS"),
            "SIGNUP_SESSION_TTL_SECS",
            DEFAULT_SESSION_TTL_SECS,
        )?;
        let session_ttl = session_ttl_from_secs(ttl_secs)
            .map_err(|e| AppError::Config(format!("SIGNUP_SESSION_TTL_SECS: {e}")))?;

        let sweep_secs: u64 = parse_or(
            get("SWEEP_INTERVAL_SECS"),
            "SWEEP_INTERVAL_SECS",
            DEFAULT_SWEEP_INTERVAL_SECS,
        )?;
        let sweep_interval = positive(sweep_secs, "SWEEP_INTERVAL_SECS").map(Duration::from_secs)?;

        let retention_secs: i64 = parse_or(
            get("SESSION_RETENTION_SECS"),
            "SESSION_RETENTION_SECS",
            DEFAULT_SESSION_RETENTION_SECS,
        )?;
        let session_retention = positive(retention_secs, "SESSION_RETENTION_SECS").and_then(|secs| {
            chrono::Duration::try_seconds(secs).ok_or_else(|| {
                AppError::Config(format!("SESSION_RETENTION_SECS is out of range: {secs}"))
            })
        })?;

        let ledger = match (
            get("LEDGER_WEBHOOK_URL"),
            get("LEDGER_WEBHOOK_SECRET"),
            get("LEDGER_TARGET_GROUP"),
        ) {
            (Some(webhook_url), Some(webhook_secret), Some(target_group)) => {
                let timeout_secs: u64 = parse_or(
                    get("LEDGER_TIMEOUT_SECS"),
                    "LEDGER_TIMEOUT_SECS",
                    DEFAULT_LEDGER_TIMEOUT_SECS,
                )?;
                Some(LedgerConfig {
                    webhook_url,
                    webhook_secret,
                    target_id: get("LEDGER_TARGET_ID").unwrap_or_else(|| target_group.clone()),
                    target_group,
                    timeout: positive(timeout_secs, "LEDGER_TIMEOUT_SECS")
                        .map(Duration::from_secs)?,
                })
            }
            _ => None,
        };

        Ok(Self {
            host,
            port,
            database_url: get("DATABASE_URL"),
            caller_fee_rate,
            session_ttl,
            sweep_interval,
            session_retention,
            ledger,
            compositions_seed_file: get("COMPOSITIONS_SEED_FILE").map(PathBuf::from),
            otlp_endpoint: get("OTEL_EXPORTER_OTLP_ENDPOINT"),
        })
    }

    /// Returns the socket address to bind.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if `HOST` is not an IP address.
    pub fn bind_addr(&self) -> Result<SocketAddr, AppError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| AppError::Config(format!("invalid HOST:PORT combination: {e}")))
    }
}

fn parse_or<T>(raw: Option<String>, key: &str, default: T) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: Display,
{
    match raw {
        Some(value) => value
            .parse()
            .map_err(|e| AppError::Config(format!("{key} has invalid value {value:?}: {e}"))),
        None => Ok(default),
    }
}

fn positive<T>(value: T, key: &str) -> Result<T, AppError>
where
    T: PartialOrd + Default + Display,
{
    if value > T::default() {
        Ok(value)
    } else {
        Err(AppError::Config(format!("{key} must be positive, got {value}")))
    }
}
