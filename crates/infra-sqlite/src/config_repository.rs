// SQLite-backed Config implementation (SPEC_FULL §4.2).

use async_trait::async_trait;
use jobq_core::error::Result;
use jobq_core::port::Config;
use sqlx::SqlitePool;

use crate::job_repository::map_sqlx_error;

pub struct SqliteConfig {
    pool: SqlitePool,
}

impl SqliteConfig {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Config for SqliteConfig {
    async fn get(&self, key: &str, fallback: &str) -> Result<String> {
        let value: Option<String> = sqlx::query_scalar("SELECT value FROM config WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(value.unwrap_or_else(|| fallback.to_string()))
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO config (key, value) VALUES (?, ?) \
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{create_pool, run_migrations};

    async fn setup() -> SqliteConfig {
        let pool = create_pool("sqlite::memory:").await.unwrap();
        run_migrations(&pool).await.unwrap();
        SqliteConfig::new(pool)
    }

    #[tokio::test]
    async fn get_returns_seeded_default() {
        let config = setup().await;
        assert_eq!(config.get("max_retries", "0").await.unwrap(), "3");
    }

    #[tokio::test]
    async fn get_falls_back_for_unknown_key() {
        let config = setup().await;
        assert_eq!(config.get("nonexistent", "fallback").await.unwrap(), "fallback");
    }

    #[tokio::test]
    async fn set_then_get_roundtrips() {
        let config = setup().await;
        config.set("max_retries", "9").await.unwrap();
        assert_eq!(config.get("max_retries", "0").await.unwrap(), "9");
    }
}
