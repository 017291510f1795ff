//! Checkpoint types and the durable-storage trait.
//!
//! A [`Checkpoint`] is one persisted snapshot of a thread: full state, a
//! monotone step counter, and the frontier of nodes still pending. The latest
//! checkpoint per thread is the unit of truth for resume; a thread whose
//! frontier is empty is finished.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use miette::Diagnostic;
use rustc_hash::FxHashMap;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::state::WorkflowState;
use crate::types::NodeName;

/// One persisted snapshot of a workflow thread.
#[derive(Clone, Debug, PartialEq)]
pub struct Checkpoint {
    /// Thread this snapshot belongs to.
    pub thread_id: String,
    /// Monotonically increasing per-thread step counter, starting at 1.
    pub step: u64,
    /// Full merged state as of this step.
    pub state: WorkflowState,
    /// Nodes still pending execution. Empty means the run is finished;
    /// non-empty means execution continues (or resumes) at the first entry.
    pub next_nodes: Vec<NodeName>,
    /// When this snapshot was written.
    pub created_at: DateTime<Utc>,
}

impl Checkpoint {
    /// Builds a snapshot stamped with the current time.
    #[must_use]
    pub fn new(
        thread_id: impl Into<String>,
        step: u64,
        state: WorkflowState,
        next_nodes: Vec<NodeName>,
    ) -> Self {
        Self {
            thread_id: thread_id.into(),
            step,
            state,
            next_nodes,
            created_at: Utc::now(),
        }
    }

    /// True if the run reached the terminal sentinel and has nothing pending.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.next_nodes.is_empty()
    }

    /// The node to execute next, if any.
    #[must_use]
    pub fn next_node(&self) -> Option<&NodeName> {
        self.next_nodes.first()
    }
}

/// Errors surfaced by checkpoint storage backends.
#[derive(Debug, Error, Diagnostic)]
pub enum CheckpointerError {
    /// The backend could not be reached. Transient; retried by the
    /// resilience layer.
    #[error("checkpoint store unavailable: {0}")]
    #[diagnostic(
        code(threadloom::checkpointer::unavailable),
        help("Check database connectivity and credentials; retries are bounded.")
    )]
    Unavailable(String),

    /// A concurrent writer advanced the thread past the step being written.
    #[error("conflicting write for thread {thread_id} at step {step}")]
    #[diagnostic(code(threadloom::checkpointer::conflict))]
    Conflict { thread_id: String, step: u64 },

    /// Non-transient backend failure (constraint violation, bad schema, ...).
    #[error("checkpoint backend error: {0}")]
    #[diagnostic(code(threadloom::checkpointer::backend))]
    Backend(String),

    /// Checkpoint payload could not be encoded or decoded.
    #[error("checkpoint serialization error: {0}")]
    #[diagnostic(code(threadloom::checkpointer::serde))]
    Serde(#[from] serde_json::Error),
}

impl CheckpointerError {
    /// Whether the resilience layer should retry this failure.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

/// Durable storage for the latest checkpoint of each thread.
///
/// Implementations must make [`put`](Self::put) atomic per thread: a reader
/// sees either the previous snapshot or the new one, never a partial write.
#[async_trait]
pub trait Checkpointer: Send + Sync {
    /// Prepare backing storage (create tables, etc.). Idempotent.
    async fn setup(&self) -> Result<(), CheckpointerError>;

    /// Persist `checkpoint` as the latest snapshot for its thread,
    /// replacing any previous one.
    async fn put(&self, checkpoint: Checkpoint) -> Result<(), CheckpointerError>;

    /// Load the latest snapshot for a thread, or `None` if the thread has
    /// never been persisted.
    async fn get(&self, thread_id: &str) -> Result<Option<Checkpoint>, CheckpointerError>;

    /// All thread ids with at least one persisted snapshot.
    async fn list_threads(&self) -> Result<Vec<String>, CheckpointerError>;
}

/// Non-durable checkpointer for tests and local development.
///
/// Keeps the latest checkpoint per thread in process memory. Contents are
/// lost on restart, which the config layer warns about when it falls back
/// to this store.
#[derive(Default)]
pub struct InMemoryCheckpointer {
    threads: RwLock<FxHashMap<String, Checkpoint>>,
}

impl InMemoryCheckpointer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Checkpointer for InMemoryCheckpointer {
    async fn setup(&self) -> Result<(), CheckpointerError> {
        Ok(())
    }

    async fn put(&self, checkpoint: Checkpoint) -> Result<(), CheckpointerError> {
        let mut threads = self.threads.write().await;
        threads.insert(checkpoint.thread_id.clone(), checkpoint);
        Ok(())
    }

    async fn get(&self, thread_id: &str) -> Result<Option<Checkpoint>, CheckpointerError> {
        let threads = self.threads.read().await;
        Ok(threads.get(thread_id).cloned())
    }

    async fn list_threads(&self) -> Result<Vec<String>, CheckpointerError> {
        let threads = self.threads.read().await;
        let mut ids: Vec<String> = threads.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }
}
