//! Command handlers for the registration context.

use warband_core::clock::Clock;
use warband_core::error::DomainError;
use warband_core::registry::{Profile, ProfileRegistry};

use crate::domain::commands::RegisterProfile;
use crate::domain::profile::{normalize_group_tag, normalize_in_game_name};

/// Handles the `RegisterProfile` command: validates the fields and upserts
/// the profile. Registering again replaces the previous profile.
///
/// # Errors
///
/// Returns `DomainError::Validation` for a blank user, an in-game name
/// outside 2 to 20 characters, or a blank guild; or a registry error.
pub async fn handle_register_profile(
    command: &RegisterProfile,
    clock: &dyn Clock,
    registry: &dyn ProfileRegistry,
) -> Result<Profile, DomainError> {
    if command.user_id.is_blank() {
        return Err(DomainError::Validation("user id must not be empty".into()));
    }
    let in_game_name = normalize_in_game_name(&command.in_game_name)?;
    let group_tag = normalize_group_tag(&command.group_tag)?;

    let profile = Profile {
        user_id: command.user_id.clone(),
        display_name: command.display_name.trim().to_owned(),
        in_game_name,
        group_tag,
        registered_at: clock.now(),
    };
    registry.upsert_profile(profile.clone()).await?;

    tracing::info!(
        correlation_id = %command.correlation_id,
        user_id = %profile.user_id,
        group_tag = %profile.group_tag,
        "profile registered"
    );
    Ok(profile)
}
