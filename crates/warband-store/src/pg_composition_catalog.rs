//! `PostgreSQL` implementation of the `CompositionCatalog` port.

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

use warband_core::catalog::{CompositionCatalog, CompositionTemplate};
use warband_core::error::DomainError;
use warband_core::registry::UserId;

use crate::infrastructure;

/// PostgreSQL-backed composition catalog. Role slots are stored as a JSON
/// array to keep their order.
#[derive(Debug, Clone)]
pub struct PgCompositionCatalog {
    pool: PgPool,
}

impl PgCompositionCatalog {
    /// Creates a new `PgCompositionCatalog`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn template_from_row(row: &PgRow) -> Result<CompositionTemplate, DomainError> {
    let role_slots: serde_json::Value = row.try_get("role_slots").map_err(|e| infrastructure(&e))?;
    let role_slots: Vec<String> = serde_json::from_value(role_slots)
        .map_err(|e| DomainError::Infrastructure(format!("malformed role slots: {e}")))?;
    Ok(CompositionTemplate {
        name: row.try_get("name").map_err(|e| infrastructure(&e))?,
        role_slots,
        created_by: UserId::new(
            row.try_get::<String, _>("created_by")
                .map_err(|e| infrastructure(&e))?,
        ),
        created_at: row.try_get("created_at").map_err(|e| infrastructure(&e))?,
    })
}

#[async_trait]
impl CompositionCatalog for PgCompositionCatalog {
    async fn find_by_name(&self, name: &str) -> Result<Option<CompositionTemplate>, DomainError> {
        let row = sqlx::query(
            "SELECT name, role_slots, created_by, created_at FROM compositions \
             WHERE LOWER(name) = LOWER($1) \
             ORDER BY created_at ASC \
             LIMIT 1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| infrastructure(&e))?;

        row.as_ref().map(template_from_row).transpose()
    }

    async fn list_names(&self) -> Result<Vec<String>, DomainError> {
        sqlx::query_scalar("SELECT DISTINCT name FROM compositions ORDER BY name ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| infrastructure(&e))
    }

    async fn insert(&self, template: CompositionTemplate) -> Result<(), DomainError> {
        let role_slots = serde_json::to_value(&template.role_slots)
            .map_err(|e| DomainError::Infrastructure(format!("role slot encoding failed: {e}")))?;

        let result = sqlx::query(
            "INSERT INTO compositions (name, role_slots, created_by, created_at) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (name) DO NOTHING",
        )
        .bind(&template.name)
        .bind(role_slots)
        .bind(template.created_by.as_str())
        .bind(template.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| infrastructure(&e))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::Validation(format!(
                "a composition named {:?} already exists",
                template.name
            )));
        }
        Ok(())
    }
}
