//! Test registry — a `ProfileRegistry` that counts lookups.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use warband_core::error::DomainError;
use warband_core::registry::{Profile, ProfileRegistry, UserId};

use crate::clock::fixed_now;

/// Builds a profile registered at [`fixed_now`].
#[must_use]
pub fn profile(user_id: &str, in_game_name: &str, group_tag: &str) -> Profile {
    Profile {
        user_id: UserId::from(user_id),
        display_name: format!("user-{user_id}"),
        in_game_name: in_game_name.to_owned(),
        group_tag: group_tag.to_owned(),
        registered_at: fixed_now(),
    }
}

/// A registry seeded with fixed profiles that records how often it was
/// queried, so tests can assert that validation short-circuits lookups.
#[derive(Debug, Default)]
pub struct CountingProfileRegistry {
    profiles: Mutex<HashMap<UserId, Profile>>,
    lookups: AtomicUsize,
}

impl CountingProfileRegistry {
    /// Creates a registry containing `profiles`.
    #[must_use]
    pub fn new(profiles: Vec<Profile>) -> Self {
        Self {
            profiles: Mutex::new(
                profiles
                    .into_iter()
                    .map(|p| (p.user_id.clone(), p))
                    .collect(),
            ),
            lookups: AtomicUsize::new(0),
        }
    }

    /// Number of `resolve_profile` calls made so far.
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProfileRegistry for CountingProfileRegistry {
    async fn resolve_profile(&self, user_id: &UserId) -> Result<Option<Profile>, DomainError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self.profiles.lock().unwrap().get(user_id).cloned())
    }

    async fn upsert_profile(&self, profile: Profile) -> Result<(), DomainError> {
        self.profiles
            .lock()
            .unwrap()
            .insert(profile.user_id.clone(), profile);
        Ok(())
    }
}
