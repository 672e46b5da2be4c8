//! Warband Core — shared domain abstractions.
//!
//! This crate defines the fundamental traits and types that all bounded
//! contexts depend on, including the ports to the external profile registry
//! and composition catalog. It contains no infrastructure code.

pub mod aggregate;
pub mod catalog;
pub mod clock;
pub mod command;
pub mod error;
pub mod event;
pub mod registry;
pub mod repository;
