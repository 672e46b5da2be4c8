//! Route modules organized by bounded context.

pub mod compositions;
pub mod health;
pub mod interactions;
pub mod profiles;
pub mod settlements;
pub mod signups;
