//! Application layer for the settlement context.

pub mod command_handlers;
