use anyhow::Result;
use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::BTreeMap;

use super::cursor::VecCursor;
use super::trait_def::{BucketCursor, CrossingEvent, EventStore, OccupancySnapshot};
use crate::stats::{
    clamp_max_count, Accumulator, AggregationPlan, BucketKey, BucketValue, RawBucketRow,
    StatsResult,
};

/// In-process event store, evaluating plans without a database
///
/// Events are kept per subject. Intended for tests, demos and single-node
/// deployments where durability is not needed.
#[derive(Default)]
pub struct MemoryStore {
    crossings: DashMap<String, Vec<CrossingEvent>>,
    occupancy: DashMap<String, Vec<OccupancySnapshot>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn count_crossings(
        &self,
        plan: &AggregationPlan,
        entering: i64,
        exiting: i64,
    ) -> Vec<RawBucketRow> {
        let mut buckets: BTreeMap<BucketKey, (u64, u64)> = BTreeMap::new();

        if let Some(events) = self.crossings.get(&plan.subject_id) {
            for event in events.iter().filter(|e| plan.window.contains(e.timestamp)) {
                let key = BucketKey::project(event.timestamp.naive_utc(), plan.grouping());
                let counts = buckets.entry(key).or_default();
                if event.crossed == entering {
                    counts.0 += 1;
                } else if event.crossed == exiting {
                    counts.1 += 1;
                }
            }
        }

        buckets
            .into_iter()
            .map(|(key, (entered, exited))| RawBucketRow {
                key,
                value: BucketValue::Crossings { entered, exited },
            })
            .collect()
    }

    fn max_occupancy(&self, plan: &AggregationPlan) -> Vec<RawBucketRow> {
        let mut buckets: BTreeMap<BucketKey, i64> = BTreeMap::new();

        if let Some(snapshots) = self.occupancy.get(&plan.subject_id) {
            for snapshot in snapshots.iter().filter(|s| plan.window.contains(s.timestamp)) {
                let key = BucketKey::project(snapshot.timestamp.naive_utc(), plan.grouping());
                buckets
                    .entry(key)
                    .and_modify(|max| *max = (*max).max(snapshot.count))
                    .or_insert(snapshot.count);
            }
        }

        buckets
            .into_iter()
            .map(|(key, max)| RawBucketRow {
                key,
                value: BucketValue::Occupancy {
                    max_count: clamp_max_count(max),
                },
            })
            .collect()
    }
}

#[async_trait]
impl EventStore for MemoryStore {
    async fn init(&self) -> Result<()> {
        Ok(())
    }

    async fn record_crossing(&self, event: &CrossingEvent) -> Result<()> {
        self.crossings
            .entry(event.gate_id.clone())
            .or_default()
            .push(event.clone());
        Ok(())
    }

    async fn record_occupancy(&self, snapshot: &OccupancySnapshot) -> Result<()> {
        self.occupancy
            .entry(snapshot.space_id.clone())
            .or_default()
            .push(snapshot.clone());
        Ok(())
    }

    async fn aggregate(&self, plan: &AggregationPlan) -> StatsResult<Box<dyn BucketCursor>> {
        let rows = match plan.accumulator {
            Accumulator::DirectionalCount { entering, exiting } => {
                self.count_crossings(plan, entering, exiting)
            }
            Accumulator::ClampedMax => self.max_occupancy(plan),
        };

        tracing::debug!(
            subject = %plan.subject_id,
            buckets = rows.len(),
            "evaluated in-memory aggregation"
        );

        Ok(Box::new(VecCursor::new(rows)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::{EventSource, IntervalType, PlanBuilder, TimeWindow};
    use chrono::{TimeZone, Utc};

    async fn drain(store: &MemoryStore, plan: &AggregationPlan) -> Vec<RawBucketRow> {
        let mut cursor = store.aggregate(plan).await.unwrap();
        let mut rows = Vec::new();
        while let Some(row) = cursor.next_row().await.unwrap() {
            rows.push(row);
        }
        cursor.close().await.unwrap();
        rows
    }

    #[tokio::test]
    async fn test_reference_direction_swaps_counts() {
        let store = MemoryStore::new();
        for crossed in [1, 1, -1, 0] {
            store
                .record_crossing(&CrossingEvent {
                    gate_id: "G1".to_string(),
                    timestamp: Utc.with_ymd_and_hms(2023, 6, 1, 10, 5, 0).unwrap(),
                    crossed,
                })
                .await
                .unwrap();
        }

        let normal = PlanBuilder::new(EventSource::Crossings, "G1")
            .group_by(IntervalType::Day)
            .count_crossings(false);
        let flipped = PlanBuilder::new(EventSource::Crossings, "G1")
            .group_by(IntervalType::Day)
            .count_crossings(true);

        assert_eq!(
            drain(&store, &normal).await[0].value,
            BucketValue::Crossings {
                entered: 2,
                exited: 1
            }
        );
        assert_eq!(
            drain(&store, &flipped).await[0].value,
            BucketValue::Crossings {
                entered: 1,
                exited: 2
            }
        );
    }

    #[tokio::test]
    async fn test_occupancy_max_per_day_is_clamped() {
        let store = MemoryStore::new();
        for (day, count) in [(1, 5), (1, -2), (1, 8), (2, -3)] {
            store
                .record_occupancy(&OccupancySnapshot {
                    space_id: "S1".to_string(),
                    timestamp: Utc.with_ymd_and_hms(2023, 6, day, 9, 0, 0).unwrap(),
                    count,
                    stale: false,
                })
                .await
                .unwrap();
        }

        let plan = PlanBuilder::new(EventSource::Occupancy, "S1")
            .window(TimeWindow {
                start: Utc.with_ymd_and_hms(2023, 6, 1, 0, 0, 0).unwrap(),
                end: Utc.with_ymd_and_hms(2023, 6, 30, 0, 0, 0).unwrap(),
            })
            .group_by(IntervalType::Day)
            .clamped_max();

        let values: Vec<BucketValue> = drain(&store, &plan).await.iter().map(|r| r.value).collect();
        assert_eq!(
            values,
            vec![
                BucketValue::Occupancy { max_count: 8 },
                BucketValue::Occupancy { max_count: 0 },
            ]
        );
    }

    #[tokio::test]
    async fn test_unknown_subject_has_no_rows() {
        let store = MemoryStore::new();
        let plan = PlanBuilder::new(EventSource::Occupancy, "missing")
            .group_by(IntervalType::Raw)
            .clamped_max();

        assert!(drain(&store, &plan).await.is_empty());
    }
}
