//! Integration tests for the PostgreSQL event store
//!
//! These tests need a running server and are skipped unless `DATABASE_URL`
//! points at one:
//! - `DATABASE_URL=postgres://localhost/gatestats_test cargo test --test postgres_storage_integration`
//!
//! Setting `DATABASE_BACKEND` to anything other than `postgres` skips them too.

use chrono::{DateTime, Duration, TimeZone, Utc};
use gatestats::stats::{
    AggregationPlan, BucketKey, BucketValue, EventSource, IntervalType, PlanBuilder,
    RawBucketRow, StatsService, TimeWindow,
};
use gatestats::storage::{CrossingEvent, EventStore, OccupancySnapshot, PostgresStore};
use std::sync::Arc;
use tokio::sync::Mutex;

// Concurrent CREATE TABLE IF NOT EXISTS can collide on the catalog
static SCHEMA_READY: Mutex<bool> = Mutex::const_new(false);

fn should_test_postgres() -> bool {
    match std::env::var("DATABASE_BACKEND") {
        Ok(val) => val.to_lowercase() == "postgres",
        Err(_) => true,
    }
}

/// Connect to the test server, or `None` when no server is configured
async fn create_postgres_store() -> Option<Arc<PostgresStore>> {
    if !should_test_postgres() {
        return None;
    }

    let db_url = match std::env::var("DATABASE_URL") {
        Ok(url) if url.starts_with("postgres") => url,
        _ => {
            println!("SKIPPED: DATABASE_URL not set to a PostgreSQL server");
            return None;
        }
    };

    let store = PostgresStore::new(&db_url, 5).await.unwrap();
    let mut ready = SCHEMA_READY.lock().await;
    if !*ready {
        store.init().await.unwrap();
        *ready = true;
    }
    drop(ready);
    Some(Arc::new(store))
}

/// Subject id unique to this run, since the database outlives the tests
fn subject(name: &str) -> String {
    format!(
        "{name}-{}-{}",
        std::process::id(),
        Utc::now().timestamp_nanos_opt().unwrap_or_default()
    )
}

fn june_first() -> TimeWindow {
    TimeWindow {
        start: Utc.with_ymd_and_hms(2023, 6, 1, 0, 0, 0).unwrap(),
        end: Utc.with_ymd_and_hms(2023, 6, 1, 23, 59, 59).unwrap(),
    }
}

async fn drain(store: Arc<PostgresStore>, plan: &AggregationPlan) -> Vec<RawBucketRow> {
    let mut rows = StatsService::new(store).aggregate(plan).await.unwrap();
    rows.sort_by_key(|r| r.key);
    rows
}

async fn record_crossing(store: &PostgresStore, gate_id: &str, at: DateTime<Utc>, crossed: i64) {
    store
        .record_crossing(&CrossingEvent {
            gate_id: gate_id.to_string(),
            timestamp: at,
            crossed,
        })
        .await
        .unwrap();
}

async fn record_occupancy(store: &PostgresStore, space_id: &str, at: DateTime<Utc>, count: i64) {
    store
        .record_occupancy(&OccupancySnapshot {
            space_id: space_id.to_string(),
            timestamp: at,
            count,
            stale: false,
        })
        .await
        .unwrap();
}

#[tokio::test]
async fn test_postgres_hourly_crossings_per_direction() {
    let Some(store) = create_postgres_store().await else {
        return;
    };
    let gate = subject("gate-hourly");

    for (h, m, crossed) in [(10, 15, 1), (10, 45, -1), (10, 50, 1), (13, 0, -1)] {
        let at = Utc.with_ymd_and_hms(2023, 6, 1, h, m, 0).unwrap();
        record_crossing(&store, &gate, at, crossed).await;
    }

    let plan = PlanBuilder::new(EventSource::Crossings, &gate)
        .window(june_first())
        .group_by(IntervalType::Hour)
        .count_crossings(false);
    let rows = drain(Arc::clone(&store), &plan).await;

    assert_eq!(rows.len(), 2);
    assert_eq!(
        rows[0].key,
        BucketKey {
            year: 2023,
            month: Some(6),
            day: Some(1),
            hour: Some(10),
            ..Default::default()
        }
    );
    assert_eq!(
        rows[0].value,
        BucketValue::Crossings {
            entered: 2,
            exited: 1
        }
    );
    assert_eq!(rows[1].key.hour, Some(13));
    assert_eq!(
        rows[1].value,
        BucketValue::Crossings {
            entered: 0,
            exited: 1
        }
    );

    // The inside reference swaps which sign counts as entering
    let inside = PlanBuilder::new(EventSource::Crossings, &gate)
        .window(june_first())
        .group_by(IntervalType::Hour)
        .count_crossings(true);
    let rows = drain(store, &inside).await;
    assert_eq!(
        rows[0].value,
        BucketValue::Crossings {
            entered: 1,
            exited: 2
        }
    );
}

#[tokio::test]
async fn test_postgres_window_bounds_are_inclusive() {
    let Some(store) = create_postgres_store().await else {
        return;
    };
    let gate = subject("gate-window");
    let other = subject("gate-other");
    let window = june_first();

    record_crossing(&store, &gate, window.start, 1).await;
    record_crossing(&store, &gate, window.end, 1).await;
    record_crossing(&store, &gate, window.end + Duration::seconds(1), 1).await;
    record_crossing(&store, &gate, window.start - Duration::seconds(1), 1).await;
    record_crossing(&store, &other, window.start, 1).await;

    let plan = PlanBuilder::new(EventSource::Crossings, &gate)
        .window(window)
        .group_by(IntervalType::Day)
        .count_crossings(false);
    let rows = drain(store, &plan).await;

    assert_eq!(rows.len(), 1);
    assert_eq!(
        rows[0].key,
        BucketKey {
            year: 2023,
            month: Some(6),
            day: Some(1),
            ..Default::default()
        }
    );
    assert_eq!(
        rows[0].value,
        BucketValue::Crossings {
            entered: 2,
            exited: 0
        }
    );
}

#[tokio::test]
async fn test_postgres_max_is_clamped_after_aggregation() {
    let Some(store) = create_postgres_store().await else {
        return;
    };
    let space = subject("space-clamp");

    for (day, count) in [(1, -5), (1, -1), (2, -5), (2, 3)] {
        let at = Utc.with_ymd_and_hms(2023, 6, day, 12, 0, 0).unwrap();
        record_occupancy(&store, &space, at, count).await;
    }

    let plan = PlanBuilder::new(EventSource::Occupancy, &space)
        .window(TimeWindow {
            start: Utc.with_ymd_and_hms(2023, 6, 1, 0, 0, 0).unwrap(),
            end: Utc.with_ymd_and_hms(2023, 6, 30, 0, 0, 0).unwrap(),
        })
        .group_by(IntervalType::Day)
        .clamped_max();
    let rows = drain(store, &plan).await;

    let values: Vec<BucketValue> = rows.iter().map(|r| r.value).collect();
    assert_eq!(
        values,
        vec![
            BucketValue::Occupancy { max_count: 0 },
            BucketValue::Occupancy { max_count: 3 },
        ]
    );
}

#[tokio::test]
async fn test_postgres_raw_buckets_keep_every_calendar_field() {
    let Some(store) = create_postgres_store().await else {
        return;
    };
    let space = subject("space-raw");
    let at = Utc.with_ymd_and_hms(2023, 12, 31, 23, 59, 58).unwrap();
    record_occupancy(&store, &space, at, 7).await;

    let plan = PlanBuilder::new(EventSource::Occupancy, &space)
        .window(TimeWindow {
            start: at,
            end: at,
        })
        .group_by(IntervalType::Raw)
        .clamped_max();
    let rows = drain(store, &plan).await;

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].key.to_instant().unwrap(), at.naive_utc());
    assert_eq!(rows[0].value, BucketValue::Occupancy { max_count: 7 });
}

#[tokio::test]
async fn test_postgres_empty_window_yields_no_rows() {
    let Some(store) = create_postgres_store().await else {
        return;
    };

    let plan = PlanBuilder::new(EventSource::Occupancy, &subject("nobody"))
        .window(june_first())
        .group_by(IntervalType::Hour)
        .clamped_max();

    assert!(drain(store, &plan).await.is_empty());
}
