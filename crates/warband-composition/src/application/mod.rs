//! Application layer for the composition context.

pub mod command_handlers;
pub mod query_handlers;
pub mod seed;
