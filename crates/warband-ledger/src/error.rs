//! Forwarding error types.

use thiserror::Error;

/// Failure to deliver a settlement to the ledger. Only ever logged.
#[derive(Debug, Error)]
pub enum ForwardingError {
    /// The ledger answered with a non-2xx status.
    #[error("ledger rejected settlement with status {status}: {body}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Response body, for diagnostics.
        body: String,
    },

    /// The request never produced a response.
    #[error("ledger transport failed: {0}")]
    Transport(String),
}

impl From<reqwest::Error> for ForwardingError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}
