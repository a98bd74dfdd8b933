//! Database connection and pool management
//!
//! The key-value store lives in a single SQLite file, the same shape mobile
//! async-storage uses. This module creates the pool, runs the embedded
//! migrations, and offers a health check.

use crate::error::CoreResult;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, warn};

/// Database configuration for pool creation
pub struct DbConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: 1,
            acquire_timeout_secs: 30,
        }
    }
}

/// Create a SQLite connection pool
pub async fn create_pool(database_url: &str, max_connections: u32) -> CoreResult<SqlitePool> {
    let config = DbConfig {
        url: database_url.to_string(),
        max_connections,
        ..Default::default()
    };
    create_pool_with_config(&config).await
}

/// Create a SQLite connection pool with custom configuration
///
/// Connections are never retired, so an in-memory database (`sqlite::memory:`)
/// keeps its contents for the lifetime of the pool.
pub async fn create_pool_with_config(config: &DbConfig) -> CoreResult<SqlitePool> {
    let connect_options = SqliteConnectOptions::from_str(&config.url)?.create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections.max(1))
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .idle_timeout(None::<Duration>)
        .max_lifetime(None::<Duration>)
        .connect_with(connect_options)
        .await?;

    info!(url = %config.url, max = config.max_connections, "Storage pool created");

    Ok(pool)
}

/// In-memory pool, used by tests and the `--memory` CLI flag
pub async fn create_memory_pool() -> CoreResult<SqlitePool> {
    create_pool("sqlite::memory:", 1).await
}

/// Run database migrations
pub async fn run_migrations(pool: &SqlitePool) -> CoreResult<()> {
    info!("Running storage migrations...");
    sqlx::migrate!("./migrations").run(pool).await?;
    info!("Storage migrations completed successfully");
    Ok(())
}

/// Check database health
pub async fn health_check(pool: &SqlitePool) -> CoreResult<()> {
    sqlx::query("SELECT 1")
        .execute(pool)
        .await
        .map(|_| ())
        .map_err(|e| {
            warn!("Storage health check failed: {}", e);
            e.into()
        })
}
