//! PostgreSQL checkpoint store.
//!
//! Stores the latest checkpoint per thread in a single `checkpoints` table,
//! payload as JSONB, upserted by thread id. The pool sits behind an async
//! `RwLock` so [`Reconnect`] can swap in a fresh pool while readers keep
//! cloned handles to the old one.

use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Row;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument};

use super::checkpointer::{Checkpoint, Checkpointer, CheckpointerError};
use super::persistence::PersistedCheckpoint;
use super::resilience::Reconnect;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS checkpoints (
    thread_id  TEXT PRIMARY KEY,
    step       BIGINT NOT NULL,
    payload    JSONB NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);
";

/// Checkpoint store backed by PostgreSQL via sqlx.
pub struct PostgresCheckpointer {
    pool: RwLock<PgPool>,
    database_url: String,
    max_connections: u32,
}

impl PostgresCheckpointer {
    pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

    /// Connect to the database. Does not create the schema; call
    /// [`setup`](Checkpointer::setup) before first use.
    #[instrument(skip(database_url))]
    pub async fn connect(database_url: &str) -> Result<Self, CheckpointerError> {
        Self::connect_with(database_url, Self::DEFAULT_MAX_CONNECTIONS).await
    }

    pub async fn connect_with(
        database_url: &str,
        max_connections: u32,
    ) -> Result<Self, CheckpointerError> {
        let pool = Self::build_pool(database_url, max_connections).await?;
        info!(max_connections, "connected to postgres checkpoint store");
        Ok(Self {
            pool: RwLock::new(pool),
            database_url: database_url.to_string(),
            max_connections,
        })
    }

    async fn build_pool(url: &str, max_connections: u32) -> Result<PgPool, CheckpointerError> {
        PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
            .map_err(classify)
    }

    async fn pool(&self) -> PgPool {
        self.pool.read().await.clone()
    }
}

#[async_trait]
impl Checkpointer for PostgresCheckpointer {
    async fn setup(&self) -> Result<(), CheckpointerError> {
        let pool = self.pool().await;
        sqlx::query(SCHEMA).execute(&pool).await.map_err(classify)?;
        debug!("checkpoint schema ensured");
        Ok(())
    }

    #[instrument(skip(self, checkpoint), fields(thread_id = %checkpoint.thread_id, step = checkpoint.step))]
    async fn put(&self, checkpoint: Checkpoint) -> Result<(), CheckpointerError> {
        let payload = PersistedCheckpoint::encode(&checkpoint).to_value()?;
        let pool = self.pool().await;
        sqlx::query(
            "INSERT INTO checkpoints (thread_id, step, payload, created_at)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (thread_id)
             DO UPDATE SET step = EXCLUDED.step,
                           payload = EXCLUDED.payload,
                           created_at = EXCLUDED.created_at",
        )
        .bind(&checkpoint.thread_id)
        .bind(checkpoint.step as i64)
        .bind(&payload)
        .bind(checkpoint.created_at)
        .execute(&pool)
        .await
        .map_err(classify)?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn get(&self, thread_id: &str) -> Result<Option<Checkpoint>, CheckpointerError> {
        let pool = self.pool().await;
        let row = sqlx::query("SELECT payload FROM checkpoints WHERE thread_id = $1")
            .bind(thread_id)
            .fetch_optional(&pool)
            .await
            .map_err(classify)?;

        let Some(row) = row else {
            return Ok(None);
        };
        let payload: Value = row.try_get("payload").map_err(classify)?;
        Ok(Some(PersistedCheckpoint::from_value(payload)?.decode()))
    }

    async fn list_threads(&self) -> Result<Vec<String>, CheckpointerError> {
        let pool = self.pool().await;
        let rows = sqlx::query("SELECT thread_id FROM checkpoints ORDER BY thread_id")
            .fetch_all(&pool)
            .await
            .map_err(classify)?;
        rows.iter()
            .map(|row| row.try_get::<String, _>("thread_id").map_err(classify))
            .collect()
    }
}

#[async_trait]
impl Reconnect for PostgresCheckpointer {
    async fn reconnect(&self) -> Result<(), CheckpointerError> {
        let fresh = Self::build_pool(&self.database_url, self.max_connections).await?;
        let mut guard = self.pool.write().await;
        let stale = std::mem::replace(&mut *guard, fresh);
        drop(guard);
        stale.close().await;
        info!("replaced postgres connection pool");
        Ok(())
    }
}

/// Split sqlx failures into transient connectivity problems and everything
/// else. Only the former are retried by the resilience layer.
fn classify(err: sqlx::Error) -> CheckpointerError {
    match err {
        sqlx::Error::Io(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::Tls(_) => CheckpointerError::Unavailable(err.to_string()),
        other => CheckpointerError::Backend(other.to_string()),
    }
}
