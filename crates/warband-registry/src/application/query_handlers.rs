//! Query handlers for the registration context.

use warband_core::error::DomainError;
use warband_core::registry::{Profile, ProfileRegistry, UserId};

/// Retrieves a user's profile.
///
/// # Errors
///
/// Returns `DomainError::NotRegistered` if the user has no profile, or a
/// registry error.
pub async fn get_profile(
    user_id: &UserId,
    registry: &dyn ProfileRegistry,
) -> Result<Profile, DomainError> {
    registry
        .resolve_profile(user_id)
        .await?
        .ok_or_else(|| DomainError::NotRegistered(user_id.clone()))
}
