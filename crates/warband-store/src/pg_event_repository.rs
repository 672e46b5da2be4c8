//! `PostgreSQL` implementation of the `EventRepository` trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use tracing::debug;
use uuid::Uuid;

use warband_core::error::DomainError;
use warband_core::repository::{EventRepository, StoredEvent};

use crate::infrastructure;

/// PostgreSQL-backed event repository.
///
/// The `(aggregate_id, sequence_number)` unique constraint is the final
/// arbiter of concurrent appends: two writers that both read version `n`
/// race for sequence `n + 1` and exactly one insert commits.
#[derive(Debug, Clone)]
pub struct PgEventRepository {
    pool: PgPool,
}

impl PgEventRepository {
    /// Creates a new `PgEventRepository`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EventRepository for PgEventRepository {
    async fn load_events(&self, aggregate_id: Uuid) -> Result<Vec<StoredEvent>, DomainError> {
        let rows = sqlx::query(
            "SELECT event_id, aggregate_id, event_type, payload, sequence_number, \
                    correlation_id, causation_id, occurred_at \
             FROM domain_events \
             WHERE aggregate_id = $1 \
             ORDER BY sequence_number ASC",
        )
        .bind(aggregate_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| infrastructure(&e))?;

        rows.iter()
            .map(|row| {
                Ok(StoredEvent {
                    event_id: row.try_get("event_id")?,
                    aggregate_id: row.try_get("aggregate_id")?,
                    event_type: row.try_get("event_type")?,
                    payload: row.try_get("payload")?,
                    sequence_number: row.try_get("sequence_number")?,
                    correlation_id: row.try_get("correlation_id")?,
                    causation_id: row.try_get("causation_id")?,
                    occurred_at: row.try_get("occurred_at")?,
                })
            })
            .collect::<Result<Vec<_>, sqlx::Error>>()
            .map_err(|e| infrastructure(&e))
    }

    async fn append_events(
        &self,
        aggregate_id: Uuid,
        expected_version: i64,
        events: &[StoredEvent],
    ) -> Result<(), DomainError> {
        let mut tx = self.pool.begin().await.map_err(|e| infrastructure(&e))?;

        let actual: i64 = sqlx::query_scalar(
            "SELECT COALESCE(MAX(sequence_number), 0) FROM domain_events WHERE aggregate_id = $1",
        )
        .bind(aggregate_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| infrastructure(&e))?;

        if actual != expected_version {
            return Err(DomainError::ConcurrencyConflict {
                aggregate_id,
                expected: expected_version,
                actual,
            });
        }

        for event in events {
            let inserted = sqlx::query(
                "INSERT INTO domain_events \
                    (event_id, aggregate_id, event_type, payload, sequence_number, \
                     correlation_id, causation_id, occurred_at) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
            )
            .bind(event.event_id)
            .bind(event.aggregate_id)
            .bind(&event.event_type)
            .bind(&event.payload)
            .bind(event.sequence_number)
            .bind(event.correlation_id)
            .bind(event.causation_id)
            .bind(event.occurred_at)
            .execute(&mut *tx)
            .await;

            if let Err(err) = inserted {
                let unique_violation = err
                    .as_database_error()
                    .is_some_and(|db| db.is_unique_violation());
                if unique_violation {
                    debug!(%aggregate_id, expected_version, "lost append race");
                    return Err(DomainError::ConcurrencyConflict {
                        aggregate_id,
                        expected: expected_version,
                        actual: expected_version + 1,
                    });
                }
                return Err(infrastructure(&err));
            }
        }

        tx.commit().await.map_err(|e| infrastructure(&e))
    }

    async fn open_aggregate_ids(
        &self,
        opened_event_type: &str,
        closed_event_type: &str,
    ) -> Result<Vec<Uuid>, DomainError> {
        sqlx::query_scalar(
            "SELECT opened.aggregate_id FROM domain_events opened \
             WHERE opened.event_type = $1 \
               AND NOT EXISTS ( \
                   SELECT 1 FROM domain_events closed \
                   WHERE closed.aggregate_id = opened.aggregate_id \
                     AND closed.event_type = $2) \
             GROUP BY opened.aggregate_id \
             ORDER BY MIN(opened.occurred_at) ASC",
        )
        .bind(opened_event_type)
        .bind(closed_event_type)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| infrastructure(&e))
    }

    async fn evict_closed_before(
        &self,
        closed_event_type: &str,
        cutoff: DateTime<Utc>,
    ) -> Result<usize, DomainError> {
        let evicted: i64 = sqlx::query_scalar(
            "WITH finished AS ( \
                 SELECT DISTINCT aggregate_id FROM domain_events \
                 WHERE event_type = $1 AND occurred_at < $2), \
             deleted AS ( \
                 DELETE FROM domain_events \
                 WHERE aggregate_id IN (SELECT aggregate_id FROM finished) \
                 RETURNING aggregate_id) \
             SELECT COUNT(DISTINCT aggregate_id) FROM deleted",
        )
        .bind(closed_event_type)
        .bind(cutoff)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| infrastructure(&e))?;
        Ok(usize::try_from(evicted).unwrap_or_default())
    }
}
