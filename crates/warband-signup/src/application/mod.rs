//! Application services for the signup context.

pub mod command_handlers;
pub mod query_handlers;
