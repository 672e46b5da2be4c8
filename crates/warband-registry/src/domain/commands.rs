//! Commands for the registration context.

use uuid::Uuid;
use warband_core::command::Command;
use warband_core::registry::UserId;

/// Command to create or replace a player's profile.
#[derive(Debug, Clone)]
pub struct RegisterProfile {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The registering user.
    pub user_id: UserId,
    /// Platform display name at registration time.
    pub display_name: String,
    /// Guild the player belongs to.
    pub group_tag: String,
    /// Character name in the game.
    pub in_game_name: String,
}

impl Command for RegisterProfile {
    fn command_type(&self) -> &'static str {
        "registry.register_profile"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn issued_by(&self) -> Option<&UserId> {
        Some(&self.user_id)
    }
}
