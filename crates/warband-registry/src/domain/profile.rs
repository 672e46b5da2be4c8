//! Profile field rules.

use std::ops::RangeInclusive;

use warband_core::error::DomainError;

/// Allowed in-game name length, in characters.
pub const IN_GAME_NAME_LEN: RangeInclusive<usize> = 2..=20;

/// Trims and checks an in-game name.
///
/// # Errors
///
/// Returns `DomainError::Validation` if the trimmed name is outside
/// [`IN_GAME_NAME_LEN`].
pub fn normalize_in_game_name(raw: &str) -> Result<String, DomainError> {
    let name = raw.trim();
    if !IN_GAME_NAME_LEN.contains(&name.chars().count()) {
        return Err(DomainError::Validation(format!(
            "in-game name must be between {} and {} characters",
            IN_GAME_NAME_LEN.start(),
            IN_GAME_NAME_LEN.end()
        )));
    }
    Ok(name.to_owned())
}

/// Trims and checks a guild tag.
///
/// # Errors
///
/// Returns `DomainError::Validation` if the trimmed tag is empty.
pub fn normalize_group_tag(raw: &str) -> Result<String, DomainError> {
    let tag = raw.trim();
    if tag.is_empty() {
        return Err(DomainError::Validation("guild must not be empty".into()));
    }
    Ok(tag.to_owned())
}
