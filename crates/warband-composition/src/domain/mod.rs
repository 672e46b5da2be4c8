//! Domain layer for the composition context.

pub mod aggregates;
pub mod commands;
pub mod events;
