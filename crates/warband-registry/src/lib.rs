//! Warband — player registration bounded context.
//!
//! Links a chat-platform user to their in-game character name and guild.
//! Signups and settlements refuse anyone without a registered profile.

pub mod application;
pub mod domain;
