//! Warband — loot settlement bounded context.
//!
//! Splits a loot total among registered participants after repair costs and
//! the caller's cut, and groups the payouts by guild. Settlements are derived
//! on request and never stored.

pub mod application;
pub mod domain;
