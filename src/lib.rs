//! # Threadloom: Durable, Resumable Workflow Orchestration
//!
//! Threadloom executes directed graphs of workflow nodes against a persisted,
//! mergeable state object. Every step is checkpointed, so a run can be
//! interrupted at designated nodes, survive a process restart, and be resumed
//! later with new caller input, all keyed by an opaque thread identifier.
//!
//! ## Core Concepts
//!
//! - **Nodes**: Async units of work that read state and return partial updates
//! - **Messages**: Conversation primitives with role-based typing
//! - **State Merge**: Field-policy merge of partial updates into thread state
//! - **Graph**: Declarative workflow definition with interrupt points
//! - **Checkpointer**: Pluggable durable storage with retry/reconnect
//! - **Orchestrator**: Name-keyed registry that external callers talk to
//!
//! ## Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use async_trait::async_trait;
//! use threadloom::graph::GraphBuilder;
//! use threadloom::message::Message;
//! use threadloom::node::{Node, NodeContext, NodeError};
//! use threadloom::runtimes::{InMemoryCheckpointer, WorkflowRunner};
//! use threadloom::state::{StateUpdate, WorkflowState};
//!
//! struct Greeter;
//!
//! #[async_trait]
//! impl Node for Greeter {
//!     async fn run(
//!         &self,
//!         _state: &WorkflowState,
//!         _ctx: NodeContext,
//!     ) -> Result<StateUpdate, NodeError> {
//!         Ok(StateUpdate::new()
//!             .with_messages(vec![Message::assistant("hello")])
//!             .with_current_step("greeted"))
//!     }
//! }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let graph = GraphBuilder::new()
//!     .add_node("greet", Greeter)
//!     .set_entry_point("greet")
//!     .add_edge("greet", "End")
//!     .compile()?;
//!
//! let runner = WorkflowRunner::new(graph, Arc::new(InMemoryCheckpointer::new()));
//! let state = runner.start("thread-1", Message::user("hi")).await?;
//! assert_eq!(state.current_step, "greeted");
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Guide
//!
//! - [`message`] - Message types and construction utilities
//! - [`state`] - Thread state and partial update types
//! - [`merge`] - Partial-state merge engine with per-field policies
//! - [`node`] - Node trait and execution primitives
//! - [`graph`] - Workflow graph definition and validation
//! - [`runtimes`] - Execution engine and checkpoint persistence
//! - [`workflow`] - A compiled graph bound to a checkpointer
//! - [`orchestrator`] - Registry and caller-facing result envelopes
//! - [`http`] - Axum transport layer over the orchestrator

pub mod config;
pub mod error;
pub mod graph;
pub mod http;
pub mod merge;
pub mod message;
pub mod node;
pub mod orchestrator;
pub mod runtimes;
pub mod serialize;
pub mod state;
pub mod telemetry;
pub mod types;
pub mod workflow;
pub mod workflows;
