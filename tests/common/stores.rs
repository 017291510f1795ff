//! Checkpoint store fixtures.

use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use threadloom::runtimes::{
    Checkpoint, Checkpointer, CheckpointerError, InMemoryCheckpointer, Reconnect,
};

/// In-memory store that fails a configured number of operations before
/// behaving normally. Counts reconnect attempts so tests can assert the
/// resilience layer actually rebuilt the connection.
pub struct FlakyStore {
    inner: InMemoryCheckpointer,
    failures_remaining: AtomicU32,
    transient: bool,
    reconnects: Arc<AtomicU32>,
}

impl FlakyStore {
    pub fn failing(times: u32) -> Self {
        Self {
            inner: InMemoryCheckpointer::new(),
            failures_remaining: AtomicU32::new(times),
            transient: true,
            reconnects: Arc::new(AtomicU32::new(0)),
        }
    }

    /// Shared counter handle, usable after the store moves into `Resilient`.
    pub fn reconnect_counter(&self) -> Arc<AtomicU32> {
        Arc::clone(&self.reconnects)
    }

    /// Fails with a non-transient backend error instead.
    pub fn failing_hard(times: u32) -> Self {
        Self {
            transient: false,
            ..Self::failing(times)
        }
    }

    fn check(&self) -> Result<(), CheckpointerError> {
        let remaining = self.failures_remaining.load(Ordering::SeqCst);
        if remaining == 0 {
            return Ok(());
        }
        self.failures_remaining.store(remaining - 1, Ordering::SeqCst);
        if self.transient {
            Err(CheckpointerError::Unavailable("connection refused".into()))
        } else {
            Err(CheckpointerError::Backend("relation does not exist".into()))
        }
    }
}

#[async_trait]
impl Checkpointer for FlakyStore {
    async fn setup(&self) -> Result<(), CheckpointerError> {
        self.check()?;
        self.inner.setup().await
    }

    async fn put(&self, checkpoint: Checkpoint) -> Result<(), CheckpointerError> {
        self.check()?;
        self.inner.put(checkpoint).await
    }

    async fn get(&self, thread_id: &str) -> Result<Option<Checkpoint>, CheckpointerError> {
        self.check()?;
        self.inner.get(thread_id).await
    }

    async fn list_threads(&self) -> Result<Vec<String>, CheckpointerError> {
        self.check()?;
        self.inner.list_threads().await
    }
}

#[async_trait]
impl Reconnect for FlakyStore {
    async fn reconnect(&self) -> Result<(), CheckpointerError> {
        self.reconnects.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
