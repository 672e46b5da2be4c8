//! Application layer for the registration context.

pub mod command_handlers;
pub mod query_handlers;
