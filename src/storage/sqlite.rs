use anyhow::Result;
use async_trait::async_trait;
use sqlx::sqlite::{SqlitePoolOptions, SqliteRow};
use sqlx::SqlitePool;
use std::sync::Arc;

use super::cursor::{forward_rows, RowSender, StreamCursor};
use super::sql::{self, Dialect};
use super::trait_def::{BucketCursor, CrossingEvent, EventStore, OccupancySnapshot};
use crate::stats::{AggregationPlan, StatsResult};

pub struct SqliteStore {
    pool: Arc<SqlitePool>,
}

impl SqliteStore {
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self {
            pool: Arc::new(pool),
        })
    }
}

#[async_trait]
impl EventStore for SqliteStore {
    async fn init(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS crossing_events (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                gate_id TEXT NOT NULL,
                occurred_at INTEGER NOT NULL,
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
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                space_id TEXT NOT NULL,
                occurred_at INTEGER NOT NULL,
                occupancy INTEGER NOT NULL,
                stale INTEGER NOT NULL DEFAULT 0
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
        sqlx::query(
            r#"
            INSERT INTO crossing_events (gate_id, occurred_at, crossed)
            VALUES (?, ?, ?)
            "#,
        )
        .bind(&event.gate_id)
        .bind(event.timestamp.timestamp())
        .bind(event.crossed)
        .execute(self.pool.as_ref())
        .await?;

        Ok(())
    }

    async fn record_occupancy(&self, snapshot: &OccupancySnapshot) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO space_results (space_id, occurred_at, occupancy, stale)
            VALUES (?, ?, ?, ?)
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
        let query = sql::render(plan, Dialect::Sqlite);
        let grouping = plan.grouping();
        let accumulator = plan.accumulator;
        let pool = Arc::clone(&self.pool);

        tracing::debug!(sql = %query.sql, "running sqlite aggregation");

        let cursor = StreamCursor::spawn(
            move |tx: RowSender<SqliteRow>| async move {
                let rows = sql::bind_all(sqlx::query(&query.sql), &query.binds)
                    .fetch(pool.as_ref());
                forward_rows(rows, tx).await;
            },
            move |row: &SqliteRow| sql::decode_row(row, grouping, accumulator),
        );

        Ok(Box::new(cursor))
    }
}
