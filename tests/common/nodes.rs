//! Node fixtures shared across integration tests.

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

use threadloom::message::Message;
use threadloom::node::{Node, NodeContext, NodeError};
use threadloom::state::{StateUpdate, WorkflowState};

/// Tags the step with its own name and records the visit in workflow_data.
pub struct Tag(pub &'static str);

#[async_trait]
impl Node for Tag {
    async fn run(&self, _state: &WorkflowState, ctx: NodeContext) -> Result<StateUpdate, NodeError> {
        Ok(StateUpdate::new()
            .with_current_step(self.0)
            .with_data(format!("visited_{}", self.0), Value::from(ctx.step)))
    }
}

/// Echoes the latest message back as an assistant reply.
pub struct Echo;

#[async_trait]
impl Node for Echo {
    async fn run(&self, state: &WorkflowState, _ctx: NodeContext) -> Result<StateUpdate, NodeError> {
        let last = state
            .last_message()
            .ok_or(NodeError::MissingInput { what: "messages" })?;
        Ok(StateUpdate::new()
            .with_current_step("echoed")
            .with_messages(vec![Message::assistant(&last.content)]))
    }
}

/// Always fails with a provider error.
pub struct Boom;

#[async_trait]
impl Node for Boom {
    async fn run(&self, _state: &WorkflowState, _ctx: NodeContext) -> Result<StateUpdate, NodeError> {
        Err(NodeError::Provider {
            provider: "test",
            message: "kaboom".into(),
        })
    }
}

/// Sleeps longer than any reasonable node timeout.
pub struct Slow(pub Duration);

#[async_trait]
impl Node for Slow {
    async fn run(&self, _state: &WorkflowState, _ctx: NodeContext) -> Result<StateUpdate, NodeError> {
        tokio::time::sleep(self.0).await;
        Ok(StateUpdate::new().with_current_step("slept"))
    }
}
