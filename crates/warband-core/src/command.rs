//! Command abstractions.

use uuid::Uuid;

use crate::registry::UserId;

/// Trait that all commands implement.
pub trait Command: Send + Sync + std::fmt::Debug {
    /// The type name for this command (for logging/routing).
    fn command_type(&self) -> &'static str;

    /// Correlation ID to trace this command through the system.
    fn correlation_id(&self) -> Uuid;

    /// The platform user that issued the command, when there is one.
    ///
    /// Maintenance commands such as the expiry sweep have no issuer.
    fn issued_by(&self) -> Option<&UserId>;
}
