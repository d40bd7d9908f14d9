pub mod cursor;
pub mod memory;
pub mod postgres;
pub mod sql;
pub mod sqlite;
pub mod trait_def;

pub use cursor::{StreamCursor, VecCursor};
pub use memory::MemoryStore;
pub use postgres::PostgresStore;
pub use sqlite::SqliteStore;
pub use trait_def::{BucketCursor, CrossingEvent, EventStore, OccupancySnapshot};

use std::sync::Arc;

use crate::config::{DatabaseBackend, DatabaseConfig};

/// Open the configured backend and make sure its tables exist
pub async fn connect(config: &DatabaseConfig) -> anyhow::Result<Arc<dyn EventStore>> {
    let store: Arc<dyn EventStore> = match config.backend {
        DatabaseBackend::Sqlite => {
            tracing::info!("Using SQLite storage: {}", config.url);
            Arc::new(SqliteStore::new(&config.url, config.max_connections).await?)
        }
        DatabaseBackend::Postgres => {
            tracing::info!("Using PostgreSQL storage: {}", config.url);
            Arc::new(PostgresStore::new(&config.url, config.max_connections).await?)
        }
        DatabaseBackend::Memory => {
            tracing::info!("Using in-memory storage; events are lost on restart");
            Arc::new(MemoryStore::new())
        }
    };

    store.init().await?;
    Ok(store)
}
