//! Retry/reconnect behavior of the resilient store wrapper.

mod common;

use std::sync::atomic::Ordering;
use std::time::Duration;

use common::stores::FlakyStore;
use threadloom::message::Message;
use threadloom::runtimes::{
    Checkpoint, Checkpointer, CheckpointerError, Resilient, RetryPolicy,
};
use threadloom::state::WorkflowState;

fn fast_policy(max_retries: u32) -> RetryPolicy {
    RetryPolicy {
        max_retries,
        retry_delay: Duration::ZERO,
    }
}

fn checkpoint(thread_id: &str) -> Checkpoint {
    Checkpoint::new(
        thread_id,
        1,
        WorkflowState::new(thread_id, Message::user("hi")),
        vec![],
    )
}

#[tokio::test]
async fn transient_failures_are_retried_with_reconnect() {
    let store = FlakyStore::failing(2);
    let reconnects = store.reconnect_counter();
    let resilient = Resilient::with_policy(store, fast_policy(3));

    resilient.put(checkpoint("t1")).await.unwrap();
    assert_eq!(reconnects.load(Ordering::SeqCst), 2);

    let loaded = resilient.get("t1").await.unwrap().unwrap();
    assert_eq!(loaded.thread_id, "t1");
}

#[tokio::test]
async fn retries_are_bounded() {
    // Four failures exhaust the first attempt plus three retries.
    let store = FlakyStore::failing(4);
    let reconnects = store.reconnect_counter();
    let resilient = Resilient::with_policy(store, fast_policy(3));

    let err = resilient.put(checkpoint("t1")).await.unwrap_err();
    assert!(matches!(err, CheckpointerError::Unavailable(_)));
    assert_eq!(reconnects.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn one_failure_under_the_bound_still_succeeds() {
    let store = FlakyStore::failing(3);
    let resilient = Resilient::with_policy(store, fast_policy(3));
    resilient.put(checkpoint("t1")).await.unwrap();
}

#[tokio::test]
async fn non_transient_failures_pass_through_immediately() {
    let store = FlakyStore::failing_hard(1);
    let reconnects = store.reconnect_counter();
    let resilient = Resilient::with_policy(store, fast_policy(3));

    let err = resilient.put(checkpoint("t1")).await.unwrap_err();
    assert!(matches!(err, CheckpointerError::Backend(_)));
    assert_eq!(reconnects.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn default_policy_allows_four_total_attempts() {
    let policy = RetryPolicy::default();
    assert_eq!(policy.max_retries, 3);
    assert_eq!(policy.retry_delay, Duration::from_secs(2));
}
