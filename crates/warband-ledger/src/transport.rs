//! Outbound delivery of ledger payloads.

use std::time::Duration;

use async_trait::async_trait;

use crate::domain::payload::LedgerPayload;
use crate::error::ForwardingError;

/// Header carrying the shared secret.
pub const SECRET_HEADER: &str = "X-Webhook-Secret";

/// Sends one payload to the ledger.
#[async_trait]
pub trait LedgerTransport: Send + Sync {
    /// Makes a single delivery attempt.
    async fn send(&self, payload: &LedgerPayload) -> Result<(), ForwardingError>;
}

/// Posts payloads as JSON to a webhook URL.
#[derive(Debug, Clone)]
pub struct HttpLedgerTransport {
    client: reqwest::Client,
    url: String,
    secret: String,
}

impl HttpLedgerTransport {
    /// Creates a transport whose requests give up after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns `ForwardingError::Transport` if the HTTP client cannot be
    /// built.
    pub fn new(
        url: impl Into<String>,
        secret: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ForwardingError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
            secret: secret.into(),
        })
    }
}

#[async_trait]
impl LedgerTransport for HttpLedgerTransport {
    async fn send(&self, payload: &LedgerPayload) -> Result<(), ForwardingError> {
        let response = self
            .client
            .post(&self.url)
            .header(SECRET_HEADER, &self.secret)
            .json(payload)
            .send()
            .await?;

        let status = response.status();
        tracing::debug!("ledger response status: {}", status);
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(ForwardingError::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}
