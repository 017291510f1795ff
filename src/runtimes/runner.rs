//! The execution engine: drives a graph over checkpointed thread state.
//!
//! [`WorkflowRunner`] owns a compiled [`Graph`] and a [`Checkpointer`] and
//! exposes the three thread operations: [`start`](WorkflowRunner::start),
//! [`resume`](WorkflowRunner::resume) and
//! [`get_state`](WorkflowRunner::get_state). Calls touching the same thread
//! are linearized behind a per-thread async mutex held for the whole call, so
//! a thread's checkpoint history is always a single totally-ordered sequence.

use rustc_hash::FxHashMap;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};

use super::checkpointer::{Checkpoint, Checkpointer};
use crate::error::WorkflowError;
use crate::graph::Graph;
use crate::message::Message;
use crate::node::{NodeContext, NodeError};
use crate::state::{ERROR_DATA_KEY, STEP_ERROR, StateUpdate, WorkflowState};
use crate::types::{NodeName, ThreadStatus};

/// Executes workflow threads against a graph and a checkpoint store.
pub struct WorkflowRunner {
    graph: Graph,
    checkpointer: Arc<dyn Checkpointer>,
    node_timeout: Option<Duration>,
    thread_locks: std::sync::Mutex<FxHashMap<String, Arc<Mutex<()>>>>,
}

impl WorkflowRunner {
    #[must_use]
    pub fn new(graph: Graph, checkpointer: Arc<dyn Checkpointer>) -> Self {
        Self {
            graph,
            checkpointer,
            node_timeout: None,
            thread_locks: std::sync::Mutex::new(FxHashMap::default()),
        }
    }

    /// Bound each node execution; an overrun fails the step with
    /// [`NodeError::Timeout`].
    #[must_use]
    pub fn with_node_timeout(mut self, timeout: Duration) -> Self {
        self.node_timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Start a new thread: seed state from the initial message and execute
    /// from the entry point until the terminal sentinel, an interrupt point,
    /// or a node failure.
    ///
    /// Returns the final merged state of this call. Starting an id that
    /// already has checkpoints overwrites its history with the fresh run.
    #[instrument(skip(self, initial_message), fields(thread_id))]
    pub async fn start(
        &self,
        thread_id: &str,
        initial_message: Message,
    ) -> Result<WorkflowState, WorkflowError> {
        if thread_id.is_empty() {
            return Err(WorkflowError::InvalidInput("empty thread id".into()));
        }
        let lock = self.thread_lock(thread_id);
        let guard = lock.lock().await;

        let state = WorkflowState::new(thread_id, initial_message);
        let entry = NodeName::Named(self.graph.entry_point().to_string());
        let result = self.drive(thread_id, state, 0, entry, false).await;

        drop(guard);
        drop(lock);
        self.release_thread_lock(thread_id);
        result
    }

    /// Resume an existing thread with a new caller message.
    ///
    /// Loads the latest checkpoint; a thread with an empty frontier is
    /// already finished and is returned unchanged, making resume idempotent
    /// once a run completes. Otherwise the message is appended, the
    /// processing flag raised, the updated state checkpointed, and execution
    /// continues at the head of the persisted frontier. The interrupt check
    /// is skipped for that first node so a paused thread actually moves.
    #[instrument(skip(self, message), fields(thread_id))]
    pub async fn resume(
        &self,
        thread_id: &str,
        message: Message,
    ) -> Result<WorkflowState, WorkflowError> {
        let lock = self.thread_lock(thread_id);
        let guard = lock.lock().await;

        let result = self.resume_locked(thread_id, message).await;

        drop(guard);
        drop(lock);
        self.release_thread_lock(thread_id);
        result
    }

    async fn resume_locked(
        &self,
        thread_id: &str,
        message: Message,
    ) -> Result<WorkflowState, WorkflowError> {
        let checkpoint = self
            .checkpointer
            .get(thread_id)
            .await?
            .ok_or_else(|| WorkflowError::ThreadNotFound {
                thread_id: thread_id.to_string(),
            })?;

        if checkpoint.is_terminal() {
            debug!(step = checkpoint.step, "thread already finished");
            return Ok(checkpoint.state);
        }
        let resume_at = checkpoint
            .next_node()
            .cloned()
            .unwrap_or(NodeName::End);

        let update = StateUpdate::new()
            .with_messages(vec![message])
            .with_processing(true);
        let state = checkpoint.state.merged(&update);
        let step = checkpoint.step + 1;
        self.persist(thread_id, step, &state, checkpoint.next_nodes.clone())
            .await?;

        self.drive(thread_id, state, step, resume_at, true).await
    }

    /// The latest checkpoint for a thread.
    pub async fn get_state(&self, thread_id: &str) -> Result<Checkpoint, WorkflowError> {
        self.checkpointer
            .get(thread_id)
            .await?
            .ok_or_else(|| WorkflowError::ThreadNotFound {
                thread_id: thread_id.to_string(),
            })
    }

    /// Derive the caller-visible lifecycle state from a checkpoint.
    #[must_use]
    pub fn status(&self, checkpoint: &Checkpoint) -> ThreadStatus {
        if checkpoint.state.is_errored() {
            return ThreadStatus::Errored;
        }
        match checkpoint.next_node() {
            None => ThreadStatus::Completed,
            Some(NodeName::Named(name)) if self.graph.should_interrupt_before(name) => {
                ThreadStatus::Interrupted
            }
            Some(_) => ThreadStatus::Running,
        }
    }

    /// Execute nodes from `cursor` until End, an interrupt point, or a
    /// failure. Every transition is checkpointed before control returns.
    async fn drive(
        &self,
        thread_id: &str,
        mut state: WorkflowState,
        mut step: u64,
        mut cursor: NodeName,
        mut resuming: bool,
    ) -> Result<WorkflowState, WorkflowError> {
        loop {
            let name = match &cursor {
                NodeName::End => {
                    state = state.merged(&StateUpdate::new().with_processing(false));
                    step += 1;
                    self.persist(thread_id, step, &state, vec![]).await?;
                    debug!(step, "thread completed");
                    return Ok(state);
                }
                NodeName::Named(name) => name.clone(),
            };

            if !resuming && self.graph.should_interrupt_before(&name) {
                state = state.merged(&StateUpdate::new().with_processing(false));
                step += 1;
                self.persist(thread_id, step, &state, vec![cursor.clone()])
                    .await?;
                debug!(step, node = %name, "interrupted before node");
                return Ok(state);
            }
            resuming = false;

            let node = self.graph.node(&name).ok_or_else(|| {
                WorkflowError::InvalidInput(format!("frontier references unknown node: {name}"))
            })?;

            step += 1;
            let ctx = NodeContext {
                node: name.clone(),
                thread_id: thread_id.to_string(),
                step,
            };
            debug!(step, node = %name, "executing node");
            let outcome = match self.node_timeout {
                Some(timeout) => tokio::time::timeout(timeout, node.run(&state, ctx))
                    .await
                    .unwrap_or(Err(NodeError::Timeout {
                        seconds: timeout.as_secs(),
                    })),
                None => node.run(&state, ctx).await,
            };

            match outcome {
                Ok(update) => {
                    state = state.merged(&update);
                    let successor = self.graph.successor(&name);
                    if successor.is_end() {
                        state = state.merged(&StateUpdate::new().with_processing(false));
                        self.persist(thread_id, step, &state, vec![]).await?;
                        debug!(step, node = %name, "thread completed");
                        return Ok(state);
                    }
                    self.persist(thread_id, step, &state, vec![successor.clone()])
                        .await?;
                    cursor = successor;
                }
                Err(err) => {
                    warn!(step, node = %name, error = %err, "node failed");
                    let update = StateUpdate::new()
                        .with_current_step(STEP_ERROR)
                        .with_data(ERROR_DATA_KEY, Value::String(err.to_string()))
                        .with_processing(false);
                    state = state.merged(&update);
                    // The frontier stays on the failed node so the thread can
                    // be resumed once the cause is fixed.
                    self.persist(thread_id, step, &state, vec![cursor.clone()])
                        .await?;
                    return Err(WorkflowError::NodeExecution { node: name, source: err });
                }
            }
        }
    }

    async fn persist(
        &self,
        thread_id: &str,
        step: u64,
        state: &WorkflowState,
        next_nodes: Vec<NodeName>,
    ) -> Result<(), WorkflowError> {
        self.checkpointer
            .put(Checkpoint::new(thread_id, step, state.clone(), next_nodes))
            .await?;
        Ok(())
    }

    fn thread_lock(&self, thread_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self
            .thread_locks
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        locks
            .entry(thread_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Drop a thread's lock entry once no caller holds it anymore.
    ///
    /// The strong-count check and the removal happen under the map lock, so
    /// a concurrent `thread_lock` cannot clone the entry in between; a count
    /// above one means another call is queued on the same thread and the
    /// entry stays.
    fn release_thread_lock(&self, thread_id: &str) {
        let mut locks = self
            .thread_locks
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if locks
            .get(thread_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(thread_id);
        }
    }

    /// Number of per-thread lock entries currently retained. Transiently
    /// non-zero while calls are in flight.
    #[must_use]
    pub fn thread_lock_count(&self) -> usize {
        self.thread_locks
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }
}
