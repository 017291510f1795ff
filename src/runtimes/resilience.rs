//! Bounded retry and reconnect around a checkpoint store.
//!
//! [`Resilient`] wraps any [`Checkpointer`] that knows how to rebuild its
//! backend connection. Transient failures are retried up to
//! [`RetryPolicy::max_retries`] extra attempts with a fixed delay, and the
//! connection is fully re-established between attempts. Non-transient errors
//! pass through immediately.

use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

use super::checkpointer::{Checkpoint, Checkpointer, CheckpointerError};

/// How a wrapped store retries transient failures.
#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    /// Extra attempts after the first failure. Total attempts are
    /// `max_retries + 1`.
    pub max_retries: u32,
    /// Fixed delay between attempts.
    pub retry_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay: Duration::from_secs(2),
        }
    }
}

/// Re-establishes a backend connection after a transient failure.
#[async_trait]
pub trait Reconnect: Send + Sync {
    async fn reconnect(&self) -> Result<(), CheckpointerError>;
}

/// A checkpoint store wrapped with bounded retry and full reconnect.
pub struct Resilient<C> {
    inner: C,
    policy: RetryPolicy,
}

impl<C> Resilient<C>
where
    C: Checkpointer + Reconnect,
{
    /// Wrap a store with the default policy (3 retries, 2 s apart).
    #[must_use]
    pub fn new(inner: C) -> Self {
        Self::with_policy(inner, RetryPolicy::default())
    }

    #[must_use]
    pub fn with_policy(inner: C, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    async fn with_retries<T, F, Fut>(
        &self,
        operation: &'static str,
        op: F,
    ) -> Result<T, CheckpointerError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, CheckpointerError>>,
    {
        let mut attempt: u32 = 0;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() && attempt < self.policy.max_retries => {
                    attempt += 1;
                    warn!(
                        operation,
                        attempt,
                        max_retries = self.policy.max_retries,
                        error = %err,
                        "checkpoint store unavailable, retrying"
                    );
                    tokio::time::sleep(self.policy.retry_delay).await;
                    if let Err(reconnect_err) = self.inner.reconnect().await {
                        warn!(
                            operation,
                            attempt,
                            error = %reconnect_err,
                            "reconnect failed, will retry the operation anyway"
                        );
                    }
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[async_trait]
impl<C> Checkpointer for Resilient<C>
where
    C: Checkpointer + Reconnect,
{
    async fn setup(&self) -> Result<(), CheckpointerError> {
        self.with_retries("setup", || self.inner.setup()).await
    }

    async fn put(&self, checkpoint: Checkpoint) -> Result<(), CheckpointerError> {
        self.with_retries("put", || self.inner.put(checkpoint.clone()))
            .await
    }

    async fn get(&self, thread_id: &str) -> Result<Option<Checkpoint>, CheckpointerError> {
        self.with_retries("get", || self.inner.get(thread_id)).await
    }

    async fn list_threads(&self) -> Result<Vec<String>, CheckpointerError> {
        self.with_retries("list_threads", || self.inner.list_threads())
            .await
    }
}
