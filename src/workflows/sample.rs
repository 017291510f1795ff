//! The sample chat workflow: two nodes with a human-in-the-loop pause.
//!
//! `process_input` normalizes the caller's latest message into
//! `workflow_data.processed_prompt`. Execution then pauses (the `respond`
//! node is an interrupt point) until the thread is resumed, at which point
//! `respond` produces an assistant reply from the accumulated prompt.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

use crate::graph::{GraphBuilder, GraphError};
use crate::message::Message;
use crate::node::{Node, NodeContext, NodeError};
use crate::runtimes::Checkpointer;
use crate::state::{StateUpdate, WorkflowState};
use crate::workflow::Workflow;

/// Name this workflow registers under.
pub const NAME: &str = "sample_workflow";

const PROCESSED_PROMPT_KEY: &str = "processed_prompt";

/// Normalizes the most recent user message into a prompt.
pub struct ProcessInput;

#[async_trait]
impl Node for ProcessInput {
    async fn run(
        &self,
        state: &WorkflowState,
        _ctx: NodeContext,
    ) -> Result<StateUpdate, NodeError> {
        let last = state
            .messages
            .iter()
            .rev()
            .find(|m| m.has_role(Message::USER))
            .ok_or(NodeError::MissingInput { what: "a user message" })?;
        if last.content.trim().is_empty() {
            return Err(NodeError::ValidationFailed("empty user message".into()));
        }
        Ok(StateUpdate::new()
            .with_current_step("input_processed")
            .with_data(
                PROCESSED_PROMPT_KEY,
                Value::String(last.content.trim().to_string()),
            ))
    }
}

/// Produces the assistant reply from the processed prompt.
///
/// Deliberately deterministic: the point of the sample is the interrupt and
/// resume flow, not the quality of the reply.
pub struct Respond;

#[async_trait]
impl Node for Respond {
    async fn run(
        &self,
        state: &WorkflowState,
        _ctx: NodeContext,
    ) -> Result<StateUpdate, NodeError> {
        let prompt = state
            .workflow_data
            .get(PROCESSED_PROMPT_KEY)
            .and_then(Value::as_str)
            .ok_or(NodeError::MissingInput {
                what: PROCESSED_PROMPT_KEY,
            })?;
        let reply = Message::new(
            Message::ASSISTANT,
            "respond_node_response",
            &format!("You said: {prompt}"),
        );
        Ok(StateUpdate::new()
            .with_current_step("responded")
            .with_messages(vec![reply]))
    }
}

/// Build the sample workflow over the given checkpoint store.
pub fn build(checkpointer: Arc<dyn Checkpointer>) -> Result<Workflow, GraphError> {
    let graph = GraphBuilder::new()
        .add_node("process_input", ProcessInput)
        .add_node("respond", Respond)
        .set_entry_point("process_input")
        .add_edge("process_input", "respond")
        .add_edge("respond", "End")
        .interrupt_before("respond")
        .compile()?;
    Ok(Workflow::new(NAME, graph, checkpointer))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtimes::InMemoryCheckpointer;

    #[tokio::test]
    async fn pauses_then_responds() {
        let workflow = build(Arc::new(InMemoryCheckpointer::new())).unwrap();

        let paused = workflow.start("t1", Message::user("hello there")).await.unwrap();
        assert_eq!(paused.current_step, "input_processed");
        assert!(!paused.is_processing);
        assert_eq!(
            paused.workflow_data[PROCESSED_PROMPT_KEY],
            Value::String("hello there".into())
        );

        let finished = workflow.resume("t1", Message::user("go on")).await.unwrap();
        assert_eq!(finished.current_step, "responded");
        let reply = finished.last_message().unwrap();
        assert!(reply.has_role(Message::ASSISTANT));
        assert!(reply.content.contains("hello there"));
    }

    #[tokio::test]
    async fn rejects_blank_input() {
        let workflow = build(Arc::new(InMemoryCheckpointer::new())).unwrap();
        let err = workflow.start("t1", Message::user("   ")).await.unwrap_err();
        assert!(err.to_string().contains("process_input"));
    }
}
