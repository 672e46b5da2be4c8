//! `PostgreSQL` implementation of the `ProfileRegistry` port.

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

use warband_core::error::DomainError;
use warband_core::registry::{Profile, ProfileRegistry, UserId};

use crate::infrastructure;

/// PostgreSQL-backed profile registry.
#[derive(Debug, Clone)]
pub struct PgProfileRegistry {
    pool: PgPool,
}

impl PgProfileRegistry {
    /// Creates a new `PgProfileRegistry`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn profile_from_row(row: &PgRow) -> Result<Profile, sqlx::Error> {
    Ok(Profile {
        user_id: UserId::new(row.try_get::<String, _>("user_id")?),
        display_name: row.try_get("display_name")?,
        in_game_name: row.try_get("in_game_name")?,
        group_tag: row.try_get("group_tag")?,
        registered_at: row.try_get("registered_at")?,
    })
}

#[async_trait]
impl ProfileRegistry for PgProfileRegistry {
    async fn resolve_profile(&self, user_id: &UserId) -> Result<Option<Profile>, DomainError> {
        let row = sqlx::query(
            "SELECT user_id, display_name, in_game_name, group_tag, registered_at \
             FROM profiles WHERE user_id = $1",
        )
        .bind(user_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| infrastructure(&e))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let profile = profile_from_row(&row).map_err(|e| infrastructure(&e))?;
        Ok(Some(profile))
    }

    async fn upsert_profile(&self, profile: Profile) -> Result<(), DomainError> {
        sqlx::query(
            "INSERT INTO profiles (user_id, display_name, in_game_name, group_tag, registered_at) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (user_id) DO UPDATE SET \
                display_name = EXCLUDED.display_name, \
                in_game_name = EXCLUDED.in_game_name, \
                group_tag = EXCLUDED.group_tag, \
                registered_at = EXCLUDED.registered_at",
        )
        .bind(profile.user_id.as_str())
        .bind(&profile.display_name)
        .bind(&profile.in_game_name)
        .bind(&profile.group_tag)
        .bind(profile.registered_at)
        .execute(&self.pool)
        .await
        .map_err(|e| infrastructure(&e))?;
        Ok(())
    }
}
