//! Domain model for the signup context.

pub mod aggregates;
pub mod commands;
pub mod events;
