//! Domain layer for ledger forwarding.

pub mod payload;
