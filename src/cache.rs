//! Small key/value cache behind the `/cache_test` endpoint

use moka::future::Cache;
use serde::Serialize;
use std::time::Duration;

/// Outcome of one cache lookup
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LookupOutcome {
    pub found: bool,
    pub key: String,
    pub value: String,
    /// Entries held after the lookup
    pub count: u64,
}

/// Bounded string cache with a fixed time to live
///
/// Entries expire a fixed time after insertion; reads do not extend them.
#[derive(Clone)]
pub struct LookupCache {
    entries: Cache<String, String>,
}

impl LookupCache {
    pub fn new(max_entries: u64, ttl: Duration) -> Self {
        let entries = Cache::builder()
            .max_capacity(max_entries)
            .time_to_live(ttl)
            .build();
        Self { entries }
    }

    /// Look up `key`, storing `value` on a miss
    ///
    /// Returns `None` when the key is missing and no value was supplied.
    pub async fn lookup(&self, key: &str, value: Option<&str>) -> Option<LookupOutcome> {
        let (found, value) = match self.entries.get(key).await {
            Some(cached) => (true, cached),
            None => {
                let value = value?.to_string();
                self.entries.insert(key.to_string(), value.clone()).await;
                (false, value)
            }
        };

        self.entries.run_pending_tasks().await;

        Some(LookupOutcome {
            found,
            key: key.to_string(),
            value,
            count: self.entries.entry_count(),
        })
    }
}
