//! Warband — composition catalog and authoring bounded context.
//!
//! A composition is a named, ordered list of role labels. Authors build one
//! up as an event-sourced draft; publishing copies it into the catalog that
//! signup sessions are opened from.

pub mod application;
pub mod domain;
