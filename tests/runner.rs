//! End-to-end engine behavior: completion, interrupt/resume, failure, and
//! checkpoint cadence against the in-memory store.

mod common;

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use common::nodes::{Boom, Echo, Slow, Tag};
use threadloom::error::WorkflowError;
use threadloom::graph::{Graph, GraphBuilder};
use threadloom::message::Message;
use threadloom::node::NodeError;
use threadloom::runtimes::{Checkpointer, InMemoryCheckpointer, WorkflowRunner};
use threadloom::types::{NodeName, ThreadStatus};

fn linear_graph() -> Graph {
    GraphBuilder::new()
        .add_node("first", Tag("first"))
        .add_node("second", Tag("second"))
        .set_entry_point("first")
        .add_edge("first", "second")
        .add_edge("second", "End")
        .compile()
        .unwrap()
}

fn interrupting_graph() -> Graph {
    GraphBuilder::new()
        .add_node("prepare", Tag("prepare"))
        .add_node("reply", Echo)
        .set_entry_point("prepare")
        .add_edge("prepare", "reply")
        .add_edge("reply", "End")
        .interrupt_before("reply")
        .compile()
        .unwrap()
}

fn runner(graph: Graph) -> (WorkflowRunner, Arc<InMemoryCheckpointer>) {
    let store = Arc::new(InMemoryCheckpointer::new());
    (WorkflowRunner::new(graph, store.clone()), store)
}

#[tokio::test]
async fn uninterrupted_run_completes_and_checkpoints() {
    let (runner, store) = runner(linear_graph());

    let state = runner.start("t1", Message::user("go")).await.unwrap();
    assert_eq!(state.current_step, "second");
    assert!(!state.is_processing);
    assert_eq!(state.workflow_data["visited_first"], json!(1));
    assert_eq!(state.workflow_data["visited_second"], json!(2));

    let latest = store.get("t1").await.unwrap().unwrap();
    assert!(latest.is_terminal());
    assert_eq!(latest.step, 2);
    assert_eq!(latest.state, state);
    assert_eq!(runner.status(&latest), ThreadStatus::Completed);
}

#[tokio::test]
async fn start_pauses_before_interrupt_node() {
    let (runner, store) = runner(interrupting_graph());

    let state = runner.start("t1", Message::user("hello")).await.unwrap();
    assert_eq!(state.current_step, "prepare");
    assert!(!state.is_processing);
    // Only the user's message so far; the reply node has not run.
    assert_eq!(state.messages.len(), 1);

    let latest = store.get("t1").await.unwrap().unwrap();
    assert_eq!(latest.next_nodes, vec![NodeName::Named("reply".into())]);
    assert_eq!(runner.status(&latest), ThreadStatus::Interrupted);
}

#[tokio::test]
async fn resume_runs_the_paused_node_and_completes() {
    let (runner, store) = runner(interrupting_graph());
    runner.start("t1", Message::user("hello")).await.unwrap();

    let state = runner.resume("t1", Message::user("continue")).await.unwrap();
    assert_eq!(state.current_step, "echoed");
    assert!(!state.is_processing);
    // user, user, assistant echo of the resume message
    assert_eq!(state.messages.len(), 3);
    assert_eq!(state.last_message().unwrap().content, "continue");
    assert!(state.last_message().unwrap().has_role(Message::ASSISTANT));

    let latest = store.get("t1").await.unwrap().unwrap();
    assert!(latest.is_terminal());
    assert_eq!(runner.status(&latest), ThreadStatus::Completed);
}

#[tokio::test]
async fn resume_of_finished_thread_is_idempotent() {
    let (runner, store) = runner(linear_graph());
    let finished = runner.start("t1", Message::user("go")).await.unwrap();
    let step_before = store.get("t1").await.unwrap().unwrap().step;

    let state = runner.resume("t1", Message::user("again")).await.unwrap();
    assert_eq!(state, finished);
    // No new checkpoint was written.
    assert_eq!(store.get("t1").await.unwrap().unwrap().step, step_before);
}

#[tokio::test]
async fn resume_of_unknown_thread_fails() {
    let (runner, _store) = runner(linear_graph());
    let err = runner.resume("ghost", Message::user("hi")).await.unwrap_err();
    assert!(matches!(
        err,
        WorkflowError::ThreadNotFound { thread_id } if thread_id == "ghost"
    ));
}

#[tokio::test]
async fn node_failure_persists_error_checkpoint_without_advancing() {
    let graph = GraphBuilder::new()
        .add_node("ok", Tag("ok"))
        .add_node("boom", Boom)
        .set_entry_point("ok")
        .add_edge("ok", "boom")
        .add_edge("boom", "End")
        .compile()
        .unwrap();
    let (runner, store) = runner(graph);

    let err = runner.start("t1", Message::user("go")).await.unwrap_err();
    let WorkflowError::NodeExecution { node, source } = err else {
        panic!("expected node execution failure");
    };
    assert_eq!(node, "boom");
    assert!(matches!(source, NodeError::Provider { .. }));

    let latest = store.get("t1").await.unwrap().unwrap();
    assert!(latest.state.is_errored());
    assert!(
        latest.state.workflow_data["error"]
            .as_str()
            .unwrap()
            .contains("kaboom")
    );
    // The frontier stays on the failed node.
    assert_eq!(latest.next_nodes, vec![NodeName::Named("boom".into())]);
    assert_eq!(runner.status(&latest), ThreadStatus::Errored);
}

#[tokio::test]
async fn node_timeout_fails_the_step() {
    let graph = GraphBuilder::new()
        .add_node("slow", Slow(Duration::from_secs(5)))
        .set_entry_point("slow")
        .add_edge("slow", "End")
        .compile()
        .unwrap();
    let store = Arc::new(InMemoryCheckpointer::new());
    let runner =
        WorkflowRunner::new(graph, store.clone()).with_node_timeout(Duration::from_millis(20));

    let err = runner.start("t1", Message::user("go")).await.unwrap_err();
    let WorkflowError::NodeExecution { source, .. } = err else {
        panic!("expected node execution failure");
    };
    assert!(matches!(source, NodeError::Timeout { .. }));
    assert!(store.get("t1").await.unwrap().unwrap().state.is_errored());
}

#[tokio::test]
async fn empty_thread_id_is_rejected() {
    let (runner, _store) = runner(linear_graph());
    let err = runner.start("", Message::user("go")).await.unwrap_err();
    assert!(matches!(err, WorkflowError::InvalidInput(_)));
}

#[tokio::test]
async fn thread_locks_are_released_after_each_call() {
    let (runner, _store) = runner(interrupting_graph());

    for i in 0..10 {
        runner
            .start(&format!("t{i}"), Message::user("hello"))
            .await
            .unwrap();
    }
    assert_eq!(runner.thread_lock_count(), 0);

    runner.resume("t3", Message::user("go on")).await.unwrap();
    runner.resume("ghost", Message::user("hi")).await.unwrap_err();
    assert_eq!(runner.thread_lock_count(), 0);
}

#[tokio::test]
async fn queued_callers_on_one_thread_still_linearize() {
    let (runner, store) = runner(interrupting_graph());
    let runner = Arc::new(runner);
    runner.start("t1", Message::user("hello")).await.unwrap();

    let mut handles = Vec::new();
    for i in 0..4 {
        let runner = Arc::clone(&runner);
        handles.push(tokio::spawn(async move {
            runner.resume("t1", Message::user(&format!("r{i}"))).await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    // One resume completed the thread; the rest were idempotent no-ops.
    let latest = store.get("t1").await.unwrap().unwrap();
    assert!(latest.is_terminal());
    assert_eq!(runner.thread_lock_count(), 0);
}

#[tokio::test]
async fn restarting_a_thread_overwrites_its_history() {
    let (runner, store) = runner(linear_graph());
    runner.start("t1", Message::user("first run")).await.unwrap();
    let state = runner.start("t1", Message::user("second run")).await.unwrap();

    assert_eq!(state.messages[0].content, "second run");
    let latest = store.get("t1").await.unwrap().unwrap();
    assert_eq!(latest.state.messages[0].content, "second run");
}
