//! Environment-driven runtime configuration.
//!
//! All knobs come from the process environment (a `.env` file is honored via
//! `dotenvy`). Missing or malformed values fall back to defaults with a
//! warning rather than refusing to boot; in particular an unreachable
//! database degrades to the in-memory store so local development never needs
//! Postgres running.

use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::runtimes::Checkpointer;
use crate::runtimes::{InMemoryCheckpointer, RetryPolicy};

#[cfg(feature = "postgres")]
use crate::runtimes::{PostgresCheckpointer, Resilient};

/// Which checkpoint backend to use.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub enum DatabaseType {
    #[default]
    InMemory,
    Postgres,
}

/// Resolved runtime settings.
#[derive(Clone, Debug)]
pub struct Settings {
    pub database_type: DatabaseType,
    pub database_url: Option<String>,
    pub port: u16,
    pub retry_policy: RetryPolicy,
}

impl Settings {
    pub const DEFAULT_PORT: u16 = 5005;

    /// Read settings from the environment, loading `.env` first if present.
    #[must_use]
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();

        let database_type = match std::env::var("DATABASE_TYPE").ok().as_deref() {
            Some("postgres") => DatabaseType::Postgres,
            Some("inmemory") | None => DatabaseType::InMemory,
            Some(other) => {
                warn!(value = other, "unknown DATABASE_TYPE, using inmemory");
                DatabaseType::InMemory
            }
        };

        let defaults = RetryPolicy::default();
        Self {
            database_type,
            database_url: std::env::var("DATABASE_URL").ok(),
            port: parse_or("PORT", Self::DEFAULT_PORT),
            retry_policy: RetryPolicy {
                max_retries: parse_or("CHECKPOINT_MAX_RETRIES", defaults.max_retries),
                retry_delay: Duration::from_secs(parse_or(
                    "CHECKPOINT_RETRY_DELAY_SECS",
                    defaults.retry_delay.as_secs(),
                )),
            },
        }
    }

    /// Build the checkpoint store these settings describe.
    ///
    /// A Postgres selection that is missing its URL or cannot connect falls
    /// back to the in-memory store with a warning, so the service still
    /// comes up (without durability).
    pub async fn create_checkpointer(&self) -> Arc<dyn Checkpointer> {
        match self.database_type {
            DatabaseType::InMemory => {
                info!("using in-memory checkpoint store (no durability)");
                Arc::new(InMemoryCheckpointer::new())
            }
            DatabaseType::Postgres => self.create_postgres().await,
        }
    }

    #[cfg(feature = "postgres")]
    async fn create_postgres(&self) -> Arc<dyn Checkpointer> {
        let Some(url) = self.database_url.as_deref() else {
            warn!("DATABASE_TYPE=postgres but DATABASE_URL is unset, falling back to in-memory");
            return Arc::new(InMemoryCheckpointer::new());
        };
        match PostgresCheckpointer::connect(url).await {
            Ok(store) => {
                let store = Resilient::with_policy(store, self.retry_policy);
                if let Err(err) = store.setup().await {
                    warn!(error = %err, "checkpoint schema setup failed, falling back to in-memory");
                    return Arc::new(InMemoryCheckpointer::new());
                }
                Arc::new(store)
            }
            Err(err) => {
                warn!(error = %err, "postgres unreachable, falling back to in-memory");
                Arc::new(InMemoryCheckpointer::new())
            }
        }
    }

    #[cfg(not(feature = "postgres"))]
    async fn create_postgres(&self) -> Arc<dyn Checkpointer> {
        warn!("built without the postgres feature, falling back to in-memory");
        Arc::new(InMemoryCheckpointer::new())
    }
}

fn parse_or<T: std::str::FromStr + Copy>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            warn!(key, value = %raw, "unparseable value, using default");
            default
        }),
        Err(_) => default,
    }
}
