//! Warband — ledger forwarding.
//!
//! After a settlement is reported, the share belonging to one guild is posted
//! to an external bookkeeping service. Delivery is best effort: one attempt,
//! detached from the request that produced the settlement, failures logged.

pub mod application;
pub mod domain;
pub mod error;
pub mod transport;

pub use application::forwarder::LedgerForwarder;
pub use domain::payload::{ForwardingTarget, LedgerPayload, build_payload};
pub use error::ForwardingError;
pub use transport::{HttpLedgerTransport, LedgerTransport};
