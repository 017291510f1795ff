//! A named, compiled graph bound to a checkpoint store.
//!
//! [`Workflow`] is the unit the orchestrator registers and callers address by
//! name. It is a thin wrapper over [`WorkflowRunner`] that carries the public
//! name and delegates the thread operations.

use std::sync::Arc;
use std::time::Duration;

use crate::error::WorkflowError;
use crate::graph::Graph;
use crate::message::Message;
use crate::runtimes::{Checkpoint, Checkpointer, WorkflowRunner};
use crate::state::WorkflowState;
use crate::types::ThreadStatus;

pub struct Workflow {
    name: String,
    runner: WorkflowRunner,
}

impl Workflow {
    #[must_use]
    pub fn new(name: impl Into<String>, graph: Graph, checkpointer: Arc<dyn Checkpointer>) -> Self {
        Self {
            name: name.into(),
            runner: WorkflowRunner::new(graph, checkpointer),
        }
    }

    /// Bound each node execution in this workflow's runs.
    #[must_use]
    pub fn with_node_timeout(name: impl Into<String>, graph: Graph, checkpointer: Arc<dyn Checkpointer>, timeout: Duration) -> Self {
        Self {
            name: name.into(),
            runner: WorkflowRunner::new(graph, checkpointer).with_node_timeout(timeout),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn start(
        &self,
        thread_id: &str,
        message: Message,
    ) -> Result<WorkflowState, WorkflowError> {
        self.runner.start(thread_id, message).await
    }

    pub async fn resume(
        &self,
        thread_id: &str,
        message: Message,
    ) -> Result<WorkflowState, WorkflowError> {
        self.runner.resume(thread_id, message).await
    }

    pub async fn get_state(&self, thread_id: &str) -> Result<Checkpoint, WorkflowError> {
        self.runner.get_state(thread_id).await
    }

    #[must_use]
    pub fn status(&self, checkpoint: &Checkpoint) -> ThreadStatus {
        self.runner.status(checkpoint)
    }
}
