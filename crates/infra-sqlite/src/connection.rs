// SQLite connection pool setup.

use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

/// Create a SQLite connection pool in WAL mode.
///
/// # Configuration
/// - `JOBQ_POOL_SIZE`: max connections (default: 20)
/// - `JOBQ_POOL_TIMEOUT`: busy timeout in seconds (default: 5)
pub async fn create_pool(database_url: &str) -> Result<SqlitePool, Box<dyn std::error::Error>> {
    let max_connections: u32 = std::env::var("JOBQ_POOL_SIZE")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(20);

    let busy_timeout_secs: u64 = std::env::var("JOBQ_POOL_TIMEOUT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(5);

    let options = SqliteConnectOptions::from_str(database_url)?
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(busy_timeout_secs))
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await
        .map_err(|e| jobq_core::AppError::Store(e.to_string()))?;

    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(&pool)
        .await
        .map_err(|e| jobq_core::AppError::Store(e.to_string()))?;

    Ok(pool)
}
