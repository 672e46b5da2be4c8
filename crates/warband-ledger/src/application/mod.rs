//! Application layer for ledger forwarding.

pub mod forwarder;
