//! Name-keyed workflow registry and caller-facing result envelopes.
//!
//! The orchestrator is the seam between transports and the engine: it
//! resolves workflow names, mints thread ids, and converts every outcome,
//! success or failure, into a serializable [`Envelope`]. Transport layers
//! never see a raw [`WorkflowError`]; they map [`Envelope::error_kind`] onto
//! their own status codes.

use rustc_hash::FxHashMap;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::{ErrorKind, WorkflowError};
use crate::message::Message;
use crate::serialize::state_to_value;
use crate::state::WorkflowState;
use crate::types::ThreadStatus;
use crate::workflow::Workflow;

/// Result envelope returned for every orchestrator operation.
///
/// `status` is one of the `STATUS_*` constants. `error_kind` never crosses
/// the wire; it exists so transports can pick a status code without parsing
/// error strings.
#[derive(Clone, Debug, Serialize)]
pub struct Envelope {
    pub status: &'static str,
    pub workflow_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_status: Option<ThreadStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip)]
    pub error_kind: Option<ErrorKind>,
}

impl Envelope {
    /// A new thread was started.
    pub const STATUS_STARTED: &'static str = "started";
    /// An existing thread consumed a caller message.
    pub const STATUS_CONTINUED: &'static str = "continued";
    /// A paused thread was explicitly resumed.
    pub const STATUS_RESUMED: &'static str = "resumed";
    /// State inspection found the thread.
    pub const STATUS_FOUND: &'static str = "found";
    /// State inspection found no checkpoint for the thread.
    pub const STATUS_NOT_FOUND: &'static str = "not_found";
    /// The operation failed; see `error` and `error_kind`.
    pub const STATUS_ERROR: &'static str = "error";

    fn success(
        status: &'static str,
        workflow_name: &str,
        thread_id: &str,
        state: &WorkflowState,
    ) -> Self {
        let message = match status {
            Self::STATUS_STARTED => "Workflow started successfully",
            Self::STATUS_CONTINUED => "Workflow continued successfully",
            Self::STATUS_RESUMED => "Workflow resumed successfully",
            Self::STATUS_FOUND => "Workflow state retrieved successfully",
            _ => "Operation completed successfully",
        };
        Self {
            status,
            workflow_name: workflow_name.to_string(),
            thread_id: Some(thread_id.to_string()),
            thread_status: None,
            state: Some(state_to_value(state)),
            error: None,
            message: Some(message.to_string()),
            error_kind: None,
        }
    }

    fn failure(workflow_name: &str, thread_id: Option<&str>, err: &WorkflowError) -> Self {
        let status = if matches!(err, WorkflowError::ThreadNotFound { .. }) {
            Self::STATUS_NOT_FOUND
        } else {
            Self::STATUS_ERROR
        };
        Self {
            status,
            workflow_name: workflow_name.to_string(),
            thread_id: thread_id.map(str::to_string),
            thread_status: None,
            state: None,
            error: Some(err.to_string()),
            message: Some(err.description()),
            error_kind: Some(err.kind()),
        }
    }
}

/// Registry of named workflows.
///
/// Built once at startup, then shared immutably across request handlers.
#[derive(Default)]
pub struct Orchestrator {
    workflows: FxHashMap<String, Arc<Workflow>>,
}

impl Orchestrator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a workflow under its name. Re-registering a name replaces
    /// the previous workflow.
    #[must_use]
    pub fn register(mut self, workflow: Workflow) -> Self {
        info!(name = workflow.name(), "registered workflow");
        self.workflows
            .insert(workflow.name().to_string(), Arc::new(workflow));
        self
    }

    /// Names of all registered workflows, sorted.
    #[must_use]
    pub fn available_workflows(&self) -> Vec<String> {
        let mut names: Vec<String> = self.workflows.keys().cloned().collect();
        names.sort();
        names
    }

    fn lookup(&self, name: &str) -> Result<&Arc<Workflow>, WorkflowError> {
        self.workflows
            .get(name)
            .ok_or_else(|| WorkflowError::UnknownWorkflow {
                name: name.to_string(),
            })
    }

    /// Start a new thread of the named workflow. A missing `thread_id` gets
    /// a freshly minted UUID.
    #[instrument(skip(self, message))]
    pub async fn start_workflow(
        &self,
        name: &str,
        message: Message,
        thread_id: Option<String>,
    ) -> Envelope {
        let thread_id = thread_id.unwrap_or_else(|| Uuid::new_v4().to_string());
        let workflow = match self.lookup(name) {
            Ok(w) => w,
            Err(err) => return Envelope::failure(name, Some(&thread_id), &err),
        };
        match workflow.start(&thread_id, message).await {
            Ok(state) => Envelope::success(Envelope::STATUS_STARTED, name, &thread_id, &state),
            Err(err) => Envelope::failure(name, Some(&thread_id), &err),
        }
    }

    /// Feed a caller message into an existing thread.
    #[instrument(skip(self, message))]
    pub async fn chat(&self, name: &str, thread_id: &str, message: Message) -> Envelope {
        self.continue_with(name, thread_id, message, Envelope::STATUS_CONTINUED)
            .await
    }

    /// Explicitly resume a thread paused at an interrupt point.
    #[instrument(skip(self, message))]
    pub async fn resume_workflow(&self, name: &str, thread_id: &str, message: Message) -> Envelope {
        self.continue_with(name, thread_id, message, Envelope::STATUS_RESUMED)
            .await
    }

    async fn continue_with(
        &self,
        name: &str,
        thread_id: &str,
        message: Message,
        status: &'static str,
    ) -> Envelope {
        let workflow = match self.lookup(name) {
            Ok(w) => w,
            Err(err) => return Envelope::failure(name, Some(thread_id), &err),
        };
        match workflow.resume(thread_id, message).await {
            Ok(state) => Envelope::success(status, name, thread_id, &state),
            Err(err) => Envelope::failure(name, Some(thread_id), &err),
        }
    }

    /// Inspect the latest persisted state of a thread.
    #[instrument(skip(self))]
    pub async fn get_workflow_state(&self, name: &str, thread_id: &str) -> Envelope {
        let workflow = match self.lookup(name) {
            Ok(w) => w,
            Err(err) => return Envelope::failure(name, Some(thread_id), &err),
        };
        match workflow.get_state(thread_id).await {
            Ok(checkpoint) => {
                let mut envelope = Envelope::success(
                    Envelope::STATUS_FOUND,
                    name,
                    thread_id,
                    &checkpoint.state,
                );
                envelope.thread_status = Some(workflow.status(&checkpoint));
                envelope
            }
            Err(err) => Envelope::failure(name, Some(thread_id), &err),
        }
    }
}
