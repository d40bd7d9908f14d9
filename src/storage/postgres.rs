use anyhow::Result;
use async_trait::async_trait;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::PgPool;
use std::sync::Arc;

use super::cursor::{forward_rows, RowSender, StreamCursor};
use super::sql::{self, Dialect};
use super::trait_def::{BucketCursor, CrossingEvent, EventStore, OccupancySnapshot};
use crate::stats::{AggregationPlan, StatsResult};

pub struct PostgresStore {
    pool: Arc<PgPool>,
}

impl PostgresStore {
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self {
            pool: Arc::new(pool),
        })
    }
}

#[async_trait]
impl EventStore for PostgresStore {
    async fn init(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS crossing_events (
                id BIGSERIAL PRIMARY KEY,
                gate_id TEXT NOT NULL,
                occurred_at BIGINT NOT NULL,
                crossed INTEGER NOT NULL
            )
            "#,
        )
        .execute(self.pool.as_ref())
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_crossing_gate_time ON crossing_events(gate_id, occurred_at)",
        )
        .execute(self.pool.as_ref())
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS space_results (
                id BIGSERIAL PRIMARY KEY,
                space_id TEXT NOT NULL,
                occurred_at BIGINT NOT NULL,
                occupancy BIGINT NOT NULL,
                stale BOOLEAN NOT NULL DEFAULT FALSE
            )
            "#,
        )
        .execute(self.pool.as_ref())
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_space_time ON space_results(space_id, occurred_at)",
        )
        .execute(self.pool.as_ref())
        .await?;

        Ok(())
    }

    async fn record_crossing(&self, event: &CrossingEvent) -> Result<()> {
        let crossed = i32::try_from(event.crossed)?;

        sqlx::query(
            r#"
            INSERT INTO crossing_events (gate_id, occurred_at, crossed)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(&event.gate_id)
        .bind(event.timestamp.timestamp())
        .bind(crossed)
        .execute(self.pool.as_ref())
        .await?;

        Ok(())
    }

    async fn record_occupancy(&self, snapshot: &OccupancySnapshot) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO space_results (space_id, occurred_at, occupancy, stale)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(&snapshot.space_id)
        .bind(snapshot.timestamp.timestamp())
        .bind(snapshot.count)
        .bind(snapshot.stale)
        .execute(self.pool.as_ref())
        .await?;

        Ok(())
    }

    async fn aggregate(&self, plan: &AggregationPlan) -> StatsResult<Box<dyn BucketCursor>> {
        let query = sql::render(plan, Dialect::Postgres);
        let grouping = plan.grouping();
        let accumulator = plan.accumulator;
        let pool = Arc::clone(&self.pool);

        tracing::debug!(sql = %query.sql, "running postgres aggregation");

        let cursor = StreamCursor::spawn(
            move |tx: RowSender<PgRow>| async move {
                let rows = sql::bind_all(sqlx::query(&query.sql), &query.binds)
                    .fetch(pool.as_ref());
                forward_rows(rows, tx).await;
            },
            move |row: &PgRow| sql::decode_row(row, grouping, accumulator),
        );

        Ok(Box::new(cursor))
    }
}
