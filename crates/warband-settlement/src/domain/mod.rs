//! Domain layer for the settlement context.

pub mod commands;
pub mod settlement;
