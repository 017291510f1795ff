//! Postgres backend round-trip. Needs a reachable database; set
//! `THREADLOOM_TEST_DATABASE_URL` to run, otherwise every test here is a
//! no-op.

#![cfg(feature = "postgres")]

use threadloom::message::Message;
use threadloom::runtimes::{Checkpoint, Checkpointer, PostgresCheckpointer};
use threadloom::state::WorkflowState;
use threadloom::types::NodeName;

fn database_url() -> Option<String> {
    std::env::var("THREADLOOM_TEST_DATABASE_URL").ok()
}

#[tokio::test]
async fn put_get_overwrite_roundtrip() {
    let Some(url) = database_url() else {
        eprintln!("THREADLOOM_TEST_DATABASE_URL unset, skipping");
        return;
    };
    let store = PostgresCheckpointer::connect(&url).await.unwrap();
    store.setup().await.unwrap();

    let thread_id = format!("it-{}", uuid::Uuid::new_v4());
    let state = WorkflowState::new(&thread_id, Message::user("hello"));
    store
        .put(Checkpoint::new(
            &thread_id,
            1,
            state.clone(),
            vec![NodeName::Named("respond".into())],
        ))
        .await
        .unwrap();

    let loaded = store.get(&thread_id).await.unwrap().unwrap();
    assert_eq!(loaded.step, 1);
    assert_eq!(loaded.state, state);
    assert_eq!(loaded.next_nodes, vec![NodeName::Named("respond".into())]);

    store
        .put(Checkpoint::new(&thread_id, 2, state, vec![]))
        .await
        .unwrap();
    let latest = store.get(&thread_id).await.unwrap().unwrap();
    assert_eq!(latest.step, 2);
    assert!(latest.is_terminal());

    assert!(
        store
            .list_threads()
            .await
            .unwrap()
            .contains(&thread_id)
    );
}

#[tokio::test]
async fn missing_thread_is_none() {
    let Some(url) = database_url() else {
        eprintln!("THREADLOOM_TEST_DATABASE_URL unset, skipping");
        return;
    };
    let store = PostgresCheckpointer::connect(&url).await.unwrap();
    store.setup().await.unwrap();
    assert!(store.get("never-written").await.unwrap().is_none());
}
