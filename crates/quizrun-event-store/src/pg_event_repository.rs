//! `PostgreSQL` implementation of the `EventRepository` trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::debug;
use uuid::Uuid;

use quizrun_core::error::DomainError;
use quizrun_core::repository::{EventRepository, StoredEvent};

use crate::schema::UNIQUE_VIOLATION;

const SELECT_STREAM: &str = r"
SELECT event_id, aggregate_id, event_type, payload, sequence_number,
       correlation_id, causation_id, occurred_at
  FROM domain_events
 WHERE aggregate_id = $1
 ORDER BY sequence_number
";

const SELECT_STREAM_VERSION: &str = r"
SELECT COALESCE(MAX(sequence_number), 0)
  FROM domain_events
 WHERE aggregate_id = $1
";

const INSERT_EVENT: &str = r"
INSERT INTO domain_events (
    event_id, aggregate_id, event_type, payload, sequence_number,
    correlation_id, causation_id, occurred_at
) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
";

const SELECT_AGGREGATE_IDS: &str = r"
SELECT DISTINCT aggregate_id
  FROM domain_events
 ORDER BY aggregate_id
";

/// PostgreSQL-backed event repository.
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

fn infrastructure(err: sqlx::Error) -> DomainError {
    DomainError::Infrastructure(err.to_string())
}

fn row_to_stored_event(row: &PgRow) -> Result<StoredEvent, DomainError> {
    Ok(StoredEvent {
        event_id: row.try_get("event_id").map_err(infrastructure)?,
        aggregate_id: row.try_get("aggregate_id").map_err(infrastructure)?,
        event_type: row.try_get("event_type").map_err(infrastructure)?,
        payload: row
            .try_get::<serde_json::Value, _>("payload")
            .map_err(infrastructure)?,
        sequence_number: row.try_get("sequence_number").map_err(infrastructure)?,
        correlation_id: row.try_get("correlation_id").map_err(infrastructure)?,
        causation_id: row.try_get("causation_id").map_err(infrastructure)?,
        occurred_at: row
            .try_get::<DateTime<Utc>, _>("occurred_at")
            .map_err(infrastructure)?,
    })
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .and_then(|db| db.code())
        .as_deref()
        == Some(UNIQUE_VIOLATION)
}

#[async_trait]
impl EventRepository for PgEventRepository {
    async fn load_events(&self, aggregate_id: Uuid) -> Result<Vec<StoredEvent>, DomainError> {
        let rows = sqlx::query(SELECT_STREAM)
            .bind(aggregate_id)
            .fetch_all(&self.pool)
            .await
            .map_err(infrastructure)?;
        rows.iter().map(row_to_stored_event).collect()
    }

    async fn append_events(
        &self,
        aggregate_id: Uuid,
        expected_version: i64,
        events: &[StoredEvent],
    ) -> Result<(), DomainError> {
        if events.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await.map_err(infrastructure)?;

        let actual: i64 = sqlx::query_scalar(SELECT_STREAM_VERSION)
            .bind(aggregate_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(infrastructure)?;
        if actual != expected_version {
            return Err(DomainError::ConcurrencyConflict {
                aggregate_id,
                expected: expected_version,
                actual,
            });
        }

        for event in events {
            let inserted = sqlx::query(INSERT_EVENT)
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
            match inserted {
                Ok(_) => {}
                // A concurrent writer committed between the version check and
                // this insert; the stream is at least one event ahead.
                Err(err) if is_unique_violation(&err) => {
                    return Err(DomainError::ConcurrencyConflict {
                        aggregate_id,
                        expected: expected_version,
                        actual: expected_version + 1,
                    });
                }
                Err(err) => return Err(infrastructure(err)),
            }
        }

        tx.commit().await.map_err(infrastructure)?;
        debug!(%aggregate_id, count = events.len(), "appended events");
        Ok(())
    }

    async fn list_aggregate_ids(&self) -> Result<Vec<Uuid>, DomainError> {
        sqlx::query_scalar::<_, Uuid>(SELECT_AGGREGATE_IDS)
            .fetch_all(&self.pool)
            .await
            .map_err(infrastructure)
    }
}
