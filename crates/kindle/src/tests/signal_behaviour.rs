//! Behavioural tests for start-signal subscribers and waiters.

use std::sync::Arc;
use std::time::Duration;

use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};

use super::support::TestWorld;

#[fixture]
fn world() -> TestWorld {
    TestWorld::new()
}

#[given("subscribers \"{list}\" registered before start")]
fn given_subscribers(world: &mut TestWorld, list: String) {
    for label in list.split(',') {
        world.subscribe(label.trim());
    }
}

#[given("{count} tasks awaiting start")]
fn given_waiters(world: &mut TestWorld, count: usize) {
    world.spawn_waiters(count);
}

#[when("subscriber \"{label}\" registers after readiness")]
fn when_late_subscriber(world: &mut TestWorld, label: String) {
    let expected = world
        .subscriptions
        .lock()
        .expect("subscription mutex poisoned")
        .len()
        + 1;
    world.subscribe(&label);
    let sink = Arc::clone(&world.subscriptions);
    let delivered = async move {
        while sink.lock().expect("subscription mutex poisoned").len() < expected {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    };
    world
        .block_on(async move { tokio::time::timeout(Duration::from_secs(5), delivered).await })
        .expect("late subscriber ran");
}

#[then("the subscribers saw \"{list}\"")]
fn then_subscribers_saw(world: &mut TestWorld, list: String) {
    let expected: Vec<String> = list.split(',').map(|entry| entry.trim().to_owned()).collect();
    let seen = world
        .subscriptions
        .lock()
        .expect("subscription mutex poisoned")
        .clone();
    assert_eq!(seen, expected);
}

#[then("every waiter received \"{payload}\"")]
fn then_waiters_received(world: &mut TestWorld, payload: String) {
    assert!(!world.waited.is_empty(), "no waiters were registered");
    assert!(
        world
            .waited
            .iter()
            .all(|value| value.as_str() == Some(payload.as_str())),
        "waiters disagreed: {:?}",
        world.waited
    );
}

#[then("the lifecycle is not ready yet")]
fn then_not_ready(world: &mut TestWorld) {
    assert!(world.lifecycle.is_started());
    assert!(!world.lifecycle.is_ready());
}

#[scenario(path = "tests/features/start_signal.feature")]
fn start_signal_behaviour(world: TestWorld) {
    let _ = world;
}
