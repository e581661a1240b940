// SQLite-backed WorkerRegistry implementation (SPEC_FULL §3/§4.5).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use jobq_core::error::Result;
use jobq_core::port::{WorkerRegistry, WorkerRow};
use sqlx::SqlitePool;

use crate::job_repository::map_sqlx_error;

fn to_rfc3339(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339()
}

fn parse_ts(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

pub struct SqliteWorkerRegistry {
    pool: SqlitePool,
}

impl SqliteWorkerRegistry {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl WorkerRegistry for SqliteWorkerRegistry {
    async fn register_worker(&self, id: &str, now: DateTime<Utc>) -> Result<()> {
        sqlx::query(
            "INSERT INTO workers (id, started_at, last_heartbeat) VALUES (?, ?, ?) \
             ON CONFLICT(id) DO UPDATE SET started_at = excluded.started_at, last_heartbeat = excluded.last_heartbeat",
        )
        .bind(id)
        .bind(to_rfc3339(now))
        .bind(to_rfc3339(now))
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn touch_heartbeat(&self, id: &str, now: DateTime<Utc>) -> Result<()> {
        sqlx::query("UPDATE workers SET last_heartbeat = ? WHERE id = ?")
            .bind(to_rfc3339(now))
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn remove_worker(&self, id: &str) -> Result<()> {
        sqlx::query("DELETE FROM workers WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn list_workers(&self) -> Result<Vec<WorkerRow>> {
        let rows: Vec<(String, String, String)> =
            sqlx::query_as("SELECT id, started_at, last_heartbeat FROM workers ORDER BY started_at ASC")
                .fetch_all(&self.pool)
                .await
                .map_err(map_sqlx_error)?;

        Ok(rows
            .into_iter()
            .map(|(id, started_at, last_heartbeat)| WorkerRow {
                id,
                started_at: parse_ts(&started_at),
                last_heartbeat: parse_ts(&last_heartbeat),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{create_pool, run_migrations};

    async fn setup() -> SqliteWorkerRegistry {
        let pool = create_pool("sqlite::memory:").await.unwrap();
        run_migrations(&pool).await.unwrap();
        SqliteWorkerRegistry::new(pool)
    }

    #[tokio::test]
    async fn register_then_list() {
        let registry = setup().await;
        registry.register_worker("worker-1", Utc::now()).await.unwrap();
        let workers = registry.list_workers().await.unwrap();
        assert_eq!(workers.len(), 1);
        assert_eq!(workers[0].id, "worker-1");
    }

    #[tokio::test]
    async fn heartbeat_then_remove() {
        let registry = setup().await;
        registry.register_worker("worker-1", Utc::now()).await.unwrap();
        registry.touch_heartbeat("worker-1", Utc::now()).await.unwrap();
        registry.remove_worker("worker-1").await.unwrap();
        assert!(registry.list_workers().await.unwrap().is_empty());
    }
}
