use axum::{
    extract::{Query, State},
    http::header,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

use super::error::{ApiError, Envelope};
use super::params::{ParamError, StatsQueryParams};
use crate::cache::{LookupCache, LookupOutcome};
use crate::observability::HttpMetrics;
use crate::stats::{StatsError, StatsResponse, StatsService};

pub struct AppState {
    pub stats: StatsService,
    pub cache: LookupCache,
    pub metrics: Arc<HttpMetrics>,
    pub query_timeout: Duration,
}

/// Liveness check
pub async fn index() -> &'static str {
    "Service alive!"
}

/// Bucketed statistics for one gate or space
pub async fn get_stats(
    State(state): State<Arc<AppState>>,
    Query(params): Query<StatsQueryParams>,
) -> Result<Json<Envelope<StatsResponse>>, ApiError> {
    let request = params.into_request()?;

    tracing::debug!(
        id = %request.subject_id,
        location = ?request.location.kind(),
        interval = %request.interval,
        "serving statistics"
    );

    // Dropping the fetch future on timeout drops the cursor, which stops the query
    let response = tokio::time::timeout(state.query_timeout, state.stats.fetch(&request))
        .await
        .map_err(|_| {
            StatsError::Query(anyhow::anyhow!(
                "aggregation exceeded {}s",
                state.query_timeout.as_secs_f64()
            ))
        })??;

    Ok(Envelope::success(response))
}

#[derive(Debug, Deserialize)]
pub struct CacheTestQuery {
    pub key: Option<String>,
    pub value: Option<String>,
}

/// Exercise the key/value cache: return a cached value or store a new one
pub async fn cache_test(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CacheTestQuery>,
) -> Result<Json<Envelope<LookupOutcome>>, ApiError> {
    let key = query
        .key
        .filter(|k| !k.is_empty())
        .ok_or(ParamError::Missing)?;
    let value = query.value.filter(|v| !v.is_empty());

    let outcome = state
        .cache
        .lookup(&key, value.as_deref())
        .await
        .ok_or(ParamError::Missing)?;

    Ok(Envelope::success(outcome))
}

/// Prometheus exposition of the HTTP metrics
pub async fn metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        state.metrics.render(),
    )
}
