use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use gatestats::api::{self, AppState};
use gatestats::cache::LookupCache;
use gatestats::config::Config;
use gatestats::observability::HttpMetrics;
use gatestats::stats::StatsService;
use gatestats::storage;

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = Config::from_env()?;
    info!("Loaded configuration");

    let store = storage::connect(&config.database)
        .await
        .context("failed to initialize storage")?;
    info!("Database initialized successfully");

    let state = Arc::new(AppState {
        stats: StatsService::new(store),
        cache: LookupCache::new(
            config.cache.max_entries,
            std::time::Duration::from_secs(config.cache.ttl_secs),
        ),
        metrics: Arc::new(HttpMetrics::new()),
        query_timeout: config.stats.query_timeout(),
    });

    match config.frontend.origin() {
        Some(origin) => info!("CORS allows frontend origin {}", origin),
        None => info!("No FRONTEND_ENDPOINT configured; cross-origin requests are rejected"),
    }

    let router = api::create_api_router(state, &config.frontend);

    let addr = format!("{}:{}", config.api_server.host, config.api_server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("🚀 Stats server listening on http://{}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}
