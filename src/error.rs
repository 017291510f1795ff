//! Engine-level error taxonomy.
//!
//! Everything a start/resume/inspect call can fail with is a
//! [`WorkflowError`]. The transport layer maps [`WorkflowError::kind`] onto
//! HTTP statuses without matching on message strings.

use miette::Diagnostic;
use thiserror::Error;

use crate::node::NodeError;
use crate::runtimes::CheckpointerError;

/// Errors surfaced by workflow execution and orchestration.
#[derive(Debug, Error, Diagnostic)]
pub enum WorkflowError {
    /// No workflow is registered under the requested name.
    #[error("unknown workflow: {name}")]
    #[diagnostic(
        code(threadloom::workflow::unknown),
        help("List registered workflows via the orchestrator or GET /workflows/available.")
    )]
    UnknownWorkflow { name: String },

    /// The thread has no persisted checkpoint.
    #[error("thread not found: {thread_id}")]
    #[diagnostic(
        code(threadloom::workflow::thread_not_found),
        help("Start the workflow first; resume and inspect require an existing thread.")
    )]
    ThreadNotFound { thread_id: String },

    /// Caller input failed validation before execution started.
    #[error("invalid input: {0}")]
    #[diagnostic(code(threadloom::workflow::invalid_input))]
    InvalidInput(String),

    /// A node raised during execution. An error checkpoint was persisted
    /// before this surfaced.
    #[error("node '{node}' failed")]
    #[diagnostic(code(threadloom::workflow::node_execution))]
    NodeExecution {
        node: String,
        #[source]
        #[diagnostic_source]
        source: NodeError,
    },

    /// The checkpoint store stayed unreachable through bounded retries.
    #[error("checkpoint store unavailable")]
    #[diagnostic(
        code(threadloom::workflow::store_unavailable),
        help("The operation is safe to retry once the store is reachable again.")
    )]
    StoreUnavailable {
        #[source]
        #[diagnostic_source]
        source: CheckpointerError,
    },

    /// Another caller advanced the same thread concurrently.
    #[error("concurrent modification of thread {thread_id}")]
    #[diagnostic(code(threadloom::workflow::concurrent_modification))]
    ConcurrentModification { thread_id: String },

    /// State or checkpoint payload could not be encoded/decoded.
    #[error("serialization failure")]
    #[diagnostic(code(threadloom::workflow::serialization))]
    Serialization(#[from] serde_json::Error),
}

impl WorkflowError {
    /// The coarse classification transports map onto status codes.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnknownWorkflow { .. } => ErrorKind::UnknownWorkflow,
            Self::ThreadNotFound { .. } => ErrorKind::ThreadNotFound,
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::NodeExecution { .. } => ErrorKind::NodeExecution,
            Self::StoreUnavailable { .. } => ErrorKind::StoreUnavailable,
            Self::ConcurrentModification { .. } => ErrorKind::ConcurrentModification,
            Self::Serialization(_) => ErrorKind::Serialization,
        }
    }

    /// Whether the caller may safely retry the same request.
    #[must_use]
    pub fn can_retry(&self) -> bool {
        matches!(
            self,
            Self::StoreUnavailable { .. } | Self::ConcurrentModification { .. }
        )
    }

    /// Human-oriented secondary line for error payloads.
    #[must_use]
    pub fn description(&self) -> String {
        match self {
            Self::UnknownWorkflow { .. } => {
                "No workflow is registered under this name.".to_string()
            }
            Self::ThreadNotFound { .. } => {
                "No checkpoint exists for this thread id.".to_string()
            }
            Self::InvalidInput(detail) => detail.clone(),
            Self::NodeExecution { source, .. } => source.to_string(),
            Self::StoreUnavailable { source } => source.to_string(),
            Self::ConcurrentModification { .. } => {
                "Another request is currently driving this thread.".to_string()
            }
            Self::Serialization(source) => source.to_string(),
        }
    }
}

impl From<CheckpointerError> for WorkflowError {
    fn from(err: CheckpointerError) -> Self {
        match err {
            CheckpointerError::Conflict { thread_id, .. } => {
                Self::ConcurrentModification { thread_id }
            }
            CheckpointerError::Serde(e) => Self::Serialization(e),
            other => Self::StoreUnavailable { source: other },
        }
    }
}

/// Payload-free classification of a [`WorkflowError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    UnknownWorkflow,
    ThreadNotFound,
    InvalidInput,
    NodeExecution,
    StoreUnavailable,
    ConcurrentModification,
    Serialization,
}

impl ErrorKind {
    /// Mirrors [`WorkflowError::can_retry`] for contexts that only kept the
    /// classification.
    #[must_use]
    pub fn can_retry(self) -> bool {
        matches!(self, Self::StoreUnavailable | Self::ConcurrentModification)
    }
}
