//! Named, foreign and persistent state through the runner.

use flow_core::{Flow, Outcome, SharedState, Store};
use flow_test_utils::{init_test_tracing, TestHarness};
use serde_json::json;

#[tokio::test]
async fn ephemeral_write_then_read_returns_value() {
    init_test_tracing();
    let runner = TestHarness::new().runner();

    let flow = Flow::write(Store::Ephemeral, "k", "1")
        .then(Flow::write(Store::Ephemeral, "k", "2"))
        .then(Flow::read(Store::Ephemeral, "k"));

    assert_eq!(runner.run(flow).await.unwrap(), Some("2".to_string()));
}

#[tokio::test]
async fn ephemeral_read_of_absent_key_is_none() {
    let runner = TestHarness::new().runner();
    let value = runner.run(Flow::read(Store::Ephemeral, "missing")).await.unwrap();
    assert_eq!(value, None);
}

#[tokio::test]
async fn ephemeral_delete_removes_key() {
    let runner = TestHarness::new().runner();

    let flow = Flow::write(Store::Ephemeral, "session", "abc")
        .then(Flow::delete(Store::Ephemeral, "session"))
        .then(Flow::read(Store::Ephemeral, "session"));

    assert_eq!(runner.run(flow).await.unwrap(), None);
}

#[tokio::test]
async fn host_supplied_state_is_visible_after_run() {
    let runner = TestHarness::new().runner();
    let state = SharedState::new();

    runner
        .run_with_state(Flow::write(Store::Ephemeral, "step", "done"), state.clone())
        .await
        .unwrap();

    assert_eq!(state.get_named("step").await, Some("done".to_string()));
}

#[tokio::test]
async fn foreign_writes_accumulate() {
    let runner = TestHarness::new().runner();

    let flow = Flow::write_foreign("a", json!(1))
        .then(Flow::write_foreign("b", json!({"nested": true})))
        .then(Flow::write_foreign("a", json!(3)))
        .then(Flow::read_foreign_all());

    let foreign = runner.run(flow).await.unwrap();
    assert_eq!(foreign.len(), 2);
    assert_eq!(foreign["a"], json!(3));
    assert_eq!(foreign["b"], json!({"nested": true}));
}

#[tokio::test]
async fn foreign_and_named_state_are_separate() {
    let runner = TestHarness::new().runner();

    let flow = Flow::write_foreign("k", json!("foreign"))
        .then(Flow::read(Store::Ephemeral, "k"));

    assert_eq!(runner.run(flow).await.unwrap(), None);
}

#[tokio::test]
async fn persistent_store_round_trips_through_collaborator() {
    let harness = TestHarness::new();
    let runner = harness.runner();

    let flow = Flow::write(Store::Persistent, "token", "t-1")
        .then(Flow::read(Store::Persistent, "token"));
    assert_eq!(runner.run(flow).await.unwrap(), Some("t-1".to_string()));

    runner
        .run(Flow::delete(Store::Persistent, "token"))
        .await
        .unwrap();
    assert!(harness.storage.is_empty().await);
}

#[tokio::test]
async fn persistent_sentinel_reads_as_absent() {
    let runner = TestHarness::new()
        .with_storage_entries([("token", "__failed"), ("user", "ada")])
        .runner();

    let flow = Flow::read(Store::Persistent, "token").and_then(|token| {
        Flow::read(Store::Persistent, "user").map(move |user| (token, user))
    });

    let (token, user) = runner.run(flow).await.unwrap();
    assert_eq!(token, None);
    assert_eq!(user, Some("ada".to_string()));
}

#[tokio::test]
async fn persistent_and_ephemeral_stores_do_not_mix() {
    let harness = TestHarness::new();
    let runner = harness.runner();

    let flow = Flow::write(Store::Ephemeral, "k", "memory")
        .then(Flow::read(Store::Persistent, "k"));

    assert_eq!(runner.run(flow).await.unwrap(), None);
    assert!(harness.storage.is_empty().await);
}

const LONG_PROGRAM_STEPS: u64 = 100_000;

#[tokio::test]
async fn long_sequential_program_runs_to_completion() {
    let runner = TestHarness::new().runner();

    let mut flow = Flow::pure(());
    for i in 0..LONG_PROGRAM_STEPS {
        flow = flow.then(Flow::write(Store::Ephemeral, "k", i.to_string()));
    }
    let flow = flow.then(Flow::read(Store::Ephemeral, "k"));

    assert_eq!(
        runner.run(flow).await.unwrap(),
        Some((LONG_PROGRAM_STEPS - 1).to_string())
    );
}

fn count_down(remaining: u64, total: u64) -> Flow<u64> {
    if remaining == 0 {
        return Flow::pure(total);
    }
    Flow::write(Store::Ephemeral, "remaining", remaining.to_string())
        .and_then(move |_| count_down(remaining - 1, total + 1))
}

#[tokio::test]
async fn long_recursive_program_runs_to_completion() {
    let runner = TestHarness::new().runner();
    let state = SharedState::new();

    let steps = runner
        .run_with_state(count_down(LONG_PROGRAM_STEPS, 0), state.clone())
        .await
        .unwrap();

    assert_eq!(steps, LONG_PROGRAM_STEPS);
    assert_eq!(state.get_named("remaining").await, Some("1".to_string()));
}

#[tokio::test]
async fn long_program_inside_recover_and_fork() {
    let runner = TestHarness::new().runner();

    let long = || {
        let mut flow = Flow::pure(0u64);
        for _ in 0..LONG_PROGRAM_STEPS {
            flow = flow.and_then(|n| Flow::write_foreign("n", json!(n)).map(move |_| n + 1));
        }
        flow
    };

    let guarded = long().map(Outcome::succeed);
    let recovered = runner.run(Flow::recover(guarded)).await.unwrap();
    assert_eq!(recovered, Ok(json!(LONG_PROGRAM_STEPS)));

    let forked = runner
        .run(Flow::fork(long().into_value()).and_then(Flow::await_control))
        .await
        .unwrap();
    assert_eq!(forked, json!(LONG_PROGRAM_STEPS));
}
