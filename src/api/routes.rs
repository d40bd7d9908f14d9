use axum::{
    http::{header, HeaderValue, Method},
    middleware,
    routing::get,
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::handlers::{cache_test, get_stats, index, metrics, AppState};
use super::middleware::track_metrics;
use crate::config::FrontendConfig;

fn cors_layer(frontend: &FrontendConfig) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    match frontend
        .origin()
        .and_then(|origin| HeaderValue::from_str(&origin).ok())
    {
        Some(origin) => layer.allow_origin(origin).allow_credentials(true),
        None => layer,
    }
}

pub fn create_api_router(state: Arc<AppState>, frontend: &FrontendConfig) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/stats", get(get_stats))
        .route("/stats/", get(get_stats))
        .route("/cache_test", get(cache_test))
        .route("/cache_test/", get(cache_test))
        .route("/metrics", get(metrics))
        .route_layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            track_metrics,
        ))
        .layer(cors_layer(frontend))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
