use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::stats::{AggregationPlan, RawBucketRow, StatsResult};

/// One gate crossing as reported by a sensor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrossingEvent {
    pub gate_id: String,
    pub timestamp: DateTime<Utc>,
    /// Signed crossing direction, conventionally +1 or -1
    pub crossed: i64,
}

/// One occupancy reading of a space
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OccupancySnapshot {
    pub space_id: String,
    pub timestamp: DateTime<Utc>,
    /// May be negative when the upstream counter drifts
    pub count: i64,
    #[serde(default)]
    pub stale: bool,
}

/// Streaming access to the rows of one aggregation
///
/// A cursor is drained with `next_row` until it returns `None`, then released
/// with `close`. It is never reused afterwards.
#[async_trait]
pub trait BucketCursor: Send {
    async fn next_row(&mut self) -> StatsResult<Option<RawBucketRow>>;

    async fn close(&mut self) -> StatsResult<()>;
}

#[async_trait]
pub trait EventStore: Send + Sync {
    /// Initialize the storage (create tables, etc.)
    async fn init(&self) -> Result<()>;

    /// Store a gate crossing
    async fn record_crossing(&self, event: &CrossingEvent) -> Result<()>;

    /// Store a space occupancy snapshot
    async fn record_occupancy(&self, snapshot: &OccupancySnapshot) -> Result<()>;

    /// Run a bucketed aggregation and return a cursor over its rows
    async fn aggregate(&self, plan: &AggregationPlan) -> StatsResult<Box<dyn BucketCursor>>;
}
