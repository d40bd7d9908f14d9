use std::sync::Arc;

use super::bucket::RawBucketRow;
use super::error::{StatsError, StatsResult};
use super::plan::AggregationPlan;
use super::request::{StatsRequest, StatsResponse};
use super::series::assemble;
use crate::storage::EventStore;

/// Answers statistics requests against an event store
#[derive(Clone)]
pub struct StatsService {
    store: Arc<dyn EventStore>,
}

impl StatsService {
    pub fn new(store: Arc<dyn EventStore>) -> Self {
        Self { store }
    }

    /// Aggregate, bucket and assemble the chart series for one request
    pub async fn fetch(&self, request: &StatsRequest) -> StatsResult<StatsResponse> {
        let plan = AggregationPlan::for_request(request)?;
        let rows = self.aggregate(&plan).await?;

        if rows.is_empty() {
            tracing::debug!(subject = %request.subject_id, "no buckets in window");
            return Err(StatsError::NoData);
        }

        let series = assemble(&rows, request)?;
        Ok(StatsResponse::new(request, series))
    }

    /// Drain every row of a plan's cursor
    ///
    /// Any failure while iterating or closing discards the rows read so far.
    pub async fn aggregate(&self, plan: &AggregationPlan) -> StatsResult<Vec<RawBucketRow>> {
        let mut cursor = self.store.aggregate(plan).await?;

        let mut rows = Vec::new();
        while let Some(row) = cursor.next_row().await? {
            rows.push(row);
        }
        cursor.close().await?;

        tracing::debug!(
            subject = %plan.subject_id,
            interval = %plan.interval,
            buckets = rows.len(),
            "aggregation drained"
        );

        Ok(rows)
    }
}
