//! Node execution primitives.
//!
//! A [`Node`] is one unit of graph execution logic: it reads the current
//! thread state and returns a [`StateUpdate`] describing only what changed.
//! Nodes never persist anything themselves; the runner merges their updates
//! and checkpoints the result.

use async_trait::async_trait;
use miette::Diagnostic;
use thiserror::Error;

use crate::state::{StateUpdate, WorkflowState};

/// Core trait for executable workflow nodes.
///
/// # Design Principles
///
/// - **Stateless**: a node holds configuration, not per-thread state
/// - **Partial output**: return only the fields that changed; the merge
///   engine reconciles them into the thread state
/// - **Fail loudly**: raise a typed [`NodeError`] on failure; the engine
///   records an error checkpoint and surfaces the failure to the caller.
///   Nodes are not retried automatically.
///
/// # Examples
///
/// ```
/// use async_trait::async_trait;
/// use threadloom::message::Message;
/// use threadloom::node::{Node, NodeContext, NodeError};
/// use threadloom::state::{StateUpdate, WorkflowState};
///
/// struct Echo;
///
/// #[async_trait]
/// impl Node for Echo {
///     async fn run(
///         &self,
///         state: &WorkflowState,
///         _ctx: NodeContext,
///     ) -> Result<StateUpdate, NodeError> {
///         let last = state
///             .last_message()
///             .ok_or(NodeError::MissingInput { what: "messages" })?;
///         Ok(StateUpdate::new()
///             .with_messages(vec![Message::assistant(&last.content)])
///             .with_current_step("echoed"))
///     }
/// }
/// ```
#[async_trait]
pub trait Node: Send + Sync {
    /// Execute this node against the given thread state.
    async fn run(&self, state: &WorkflowState, ctx: NodeContext)
    -> Result<StateUpdate, NodeError>;
}

/// Execution context passed to nodes.
///
/// Identifies which node is running, for which thread, at which persisted
/// step, primarily for tracing and diagnostics.
#[derive(Clone, Debug)]
pub struct NodeContext {
    /// Name of the node being executed.
    pub node: String,
    /// Thread this execution belongs to.
    pub thread_id: String,
    /// Step number the resulting checkpoint will carry.
    pub step: u64,
}

/// Errors raised by node execution.
///
/// These are fatal for the current step: the engine merges an error update
/// into state (`current_step = "error"`, failure text under
/// `workflow_data.error`), checkpoints it, and propagates the failure.
#[derive(Debug, Error, Diagnostic)]
pub enum NodeError {
    /// Expected input data is missing from the thread state.
    #[error("missing expected input: {what}")]
    #[diagnostic(
        code(threadloom::node::missing_input),
        help("Check that the previous node produced the required data.")
    )]
    MissingInput { what: &'static str },

    /// External provider or service error.
    #[error("provider error ({provider}): {message}")]
    #[diagnostic(code(threadloom::node::provider))]
    Provider {
        provider: &'static str,
        message: String,
    },

    /// JSON serialization/deserialization error inside node logic.
    #[error(transparent)]
    #[diagnostic(code(threadloom::node::serde_json))]
    Serde(#[from] serde_json::Error),

    /// Input validation failed.
    #[error("validation failed: {0}")]
    #[diagnostic(
        code(threadloom::node::validation),
        help("Check input data format and required fields.")
    )]
    ValidationFailed(String),

    /// The node exceeded its execution deadline.
    #[error("node timed out after {seconds}s")]
    #[diagnostic(
        code(threadloom::node::timeout),
        help("Raise the runner's node timeout or bound the node's outbound calls.")
    )]
    Timeout { seconds: u64 },
}
