//! BDD step definitions for polling feature

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use cucumber::{given, then, when};
use tokio_util::sync::CancellationToken;

use herald::engine::{Engine, TickOutcome};
use herald::kuma::{FetchOutcome, Heartbeat, MonitorDirectoryEntry, StatusSource};
use herald::presence::StatePresence;
use herald::state::new_state_handle;

use super::aggregation_steps::parse_status;
use crate::world::HeraldWorld;

/// A status source replaying the scenario's scripted results
#[derive(Debug)]
struct ScriptedSource {
    script: Arc<Mutex<VecDeque<herald::Result<FetchOutcome>>>>,
    calls: Arc<AtomicU32>,
}

#[async_trait::async_trait]
impl StatusSource for ScriptedSource {
    async fn fetch(&self) -> herald::Result<FetchOutcome> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(herald::HeraldError::Fetch("script exhausted".to_string())))
    }
}

fn engine(world: &mut HeraldWorld) -> &Engine {
    if world.engine.is_none() {
        let source = Arc::new(ScriptedSource {
            script: Arc::clone(&world.script),
            calls: Arc::clone(&world.fetch_count),
        });
        let state = new_state_handle();
        world.engine = Some(Engine::new(
            Some(source),
            world.services.clone(),
            Arc::new(StatePresence::new(Arc::clone(&state))),
            128,
            state,
            CancellationToken::new(),
        ));
    }
    world.engine.as_ref().expect("engine just built")
}

fn every_service_with(world: &HeraldWorld, code: i64) -> FetchOutcome {
    FetchOutcome::Fetched {
        directory: world
            .services
            .iter()
            .enumerate()
            .map(|(i, s)| MonitorDirectoryEntry {
                monitor_id: i.to_string(),
                monitor_name: s.monitor_name.clone(),
            })
            .collect(),
        heartbeats: (0..world.services.len())
            .map(|i| (i.to_string(), vec![Heartbeat { status: Some(code) }]))
            .collect(),
    }
}

#[given(expr = "the status source reports every service {string}")]
fn source_reports(world: &mut HeraldWorld, status: String) {
    let code = match status.as_str() {
        "online" => 1,
        "maintenance" => 2,
        _ => 0,
    };
    let outcome = every_service_with(world, code);
    world.script.lock().unwrap().push_back(Ok(outcome));
}

#[given("the status source fails")]
fn source_fails(world: &mut HeraldWorld) {
    world
        .script
        .lock()
        .unwrap()
        .push_back(Err(herald::HeraldError::Fetch("connection refused".to_string())));
}

#[given("the status source then fails")]
fn source_then_fails(world: &mut HeraldWorld) {
    source_fails(world);
}

#[given("the heartbeat feed then becomes unavailable")]
fn heartbeats_unavailable(world: &mut HeraldWorld) {
    world
        .script
        .lock()
        .unwrap()
        .push_back(Ok(FetchOutcome::AllOffline));
}

#[when("a polling cycle runs")]
async fn polling_cycle(world: &mut HeraldWorld) {
    let outcome = engine(world).tick().await;
    world.last_outcome = Some(outcome);
}

#[when("the current snapshot is requested")]
async fn snapshot_requested(world: &mut HeraldWorld) {
    let snapshot = engine(world).current_snapshot().await;
    world.held_snapshot = Some(snapshot);
}

#[when("a reader holds the current snapshot")]
async fn reader_holds_snapshot(world: &mut HeraldWorld) {
    let snapshot = engine(world).state().read().await.snapshot();
    world.held_snapshot = Some(snapshot);
}

#[then(regex = r"^the last cycle (updated the snapshot|kept the previous snapshot|fell back to all offline)$")]
fn last_cycle(world: &mut HeraldWorld, outcome: String) {
    let expected = match outcome.as_str() {
        "updated the snapshot" => TickOutcome::Updated,
        "kept the previous snapshot" => TickOutcome::Retained,
        "fell back to all offline" => TickOutcome::Fallback,
        other => panic!("Unknown outcome: {}", other),
    };
    assert_eq!(world.last_outcome, Some(expected));
}

#[then(expr = "every service is {string}")]
async fn every_service_is(world: &mut HeraldWorld, status: String) {
    let expected = parse_status(&status);
    let snapshot = engine(world).state().read().await.snapshot();
    assert_eq!(snapshot.len(), world.services.len());
    for service in &world.services {
        assert_eq!(snapshot.get(&service.id), Some(expected), "{}", service.id);
    }
}

#[then(expr = "the held snapshot shows every service {string}")]
fn held_snapshot_shows(world: &mut HeraldWorld, status: String) {
    let expected = parse_status(&status);
    let held = world.held_snapshot.as_ref().expect("no snapshot held");
    for service in &world.services {
        assert_eq!(held.get(&service.id), Some(expected), "{}", service.id);
    }
}

#[then("the current snapshot equals the held snapshot")]
async fn current_equals_held(world: &mut HeraldWorld) {
    let current = engine(world).state().read().await.snapshot();
    let held = world.held_snapshot.as_ref().expect("no snapshot held");
    assert_eq!(*current, **held);
}

#[then(expr = "the engine has recorded {int} consecutive failures")]
async fn consecutive_failures(world: &mut HeraldWorld, count: u32) {
    let failures = engine(world).state().read().await.consecutive_failures;
    assert_eq!(failures, count);
}

#[then(expr = "the status source was queried {int} times")]
fn source_queried(world: &mut HeraldWorld, count: u32) {
    assert_eq!(world.fetch_count.load(Ordering::SeqCst), count);
}

#[then(expr = "the presence shows {string}")]
async fn presence_shows(world: &mut HeraldWorld, expected: String) {
    let presence = engine(world).state().read().await.presence.clone();
    assert_eq!(presence.map(|p| p.name), Some(expected));
}
