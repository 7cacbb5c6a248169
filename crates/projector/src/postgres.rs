use async_trait::async_trait;
use common::{ClientId, OrderId};
use event_log::EventId;
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::error::Result;
use crate::store::{RecordStore, StoredEvent};

/// PostgreSQL-backed record store.
///
/// Deduplication rides on the unique constraint over `id`; fold order is the
/// `seq` column, assigned at insert time.
#[derive(Clone)]
pub struct PostgresRecordStore {
    pool: PgPool,
}

impl PostgresRecordStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Creates the schema if it is not there yet.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::raw_sql(include_str!("../../../migrations/001_create_stored_events.sql"))
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    fn row_to_event(row: PgRow) -> Result<StoredEvent> {
        Ok(StoredEvent {
            id: EventId::from_uuid(row.try_get::<Uuid, _>("id")?),
            stream: row.try_get("stream")?,
            event_type: row.try_get("event_type")?,
            timestamp: row.try_get("timestamp")?,
            payload: row.try_get("payload")?,
        })
    }

    async fn fetch_ordered(&self, query: sqlx::query::Query<'_, sqlx::Postgres, sqlx::postgres::PgArguments>) -> Result<Vec<StoredEvent>> {
        let rows = query.fetch_all(&self.pool).await?;
        rows.into_iter().map(Self::row_to_event).collect()
    }
}

#[async_trait]
impl RecordStore for PostgresRecordStore {
    async fn insert_if_absent(&self, event: StoredEvent) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO stored_events (id, stream, event_type, timestamp, payload)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(event.id.as_uuid())
        .bind(&event.stream)
        .bind(&event.event_type)
        .bind(event.timestamp)
        .bind(&event.payload)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn events_for_order(&self, order_id: &OrderId) -> Result<Vec<StoredEvent>> {
        self.fetch_ordered(
            sqlx::query(
                r#"
                SELECT id, stream, event_type, timestamp, payload
                FROM stored_events
                WHERE payload ->> 'orderId' = $1
                ORDER BY seq
                "#,
            )
            .bind(order_id.as_str()),
        )
        .await
    }

    async fn events_for_client(&self, client_id: ClientId) -> Result<Vec<StoredEvent>> {
        self.fetch_ordered(
            sqlx::query(
                r#"
                SELECT id, stream, event_type, timestamp, payload
                FROM stored_events
                WHERE payload ->> 'clientId' = $1
                ORDER BY seq
                "#,
            )
            .bind(client_id.as_i64().to_string()),
        )
        .await
    }

    async fn events_of_types(&self, types: &[&str]) -> Result<Vec<StoredEvent>> {
        let types: Vec<String> = types.iter().map(|t| t.to_string()).collect();
        self.fetch_ordered(
            sqlx::query(
                r#"
                SELECT id, stream, event_type, timestamp, payload
                FROM stored_events
                WHERE event_type = ANY($1)
                ORDER BY seq
                "#,
            )
            .bind(types),
        )
        .await
    }

    async fn count(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM stored_events")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }
}
