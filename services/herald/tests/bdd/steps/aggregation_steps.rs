//! BDD step definitions for status aggregation feature

use cucumber::{given, then, when};

use herald::aggregator::reconcile;
use herald::config::Config;
use herald::kuma::{Heartbeat, MonitorDirectoryEntry};
use herald::presence::summary_line;
use herald::status::ServiceStatus;

use crate::world::HeraldWorld;

pub fn parse_status(s: &str) -> ServiceStatus {
    serde_json::from_value(serde_json::Value::String(s.to_string()))
        .unwrap_or_else(|_| panic!("Unknown status: {}", s))
}

#[given("the default tracked services")]
fn default_services(world: &mut HeraldWorld) {
    world.services = Config::default().services;
}

#[given(expr = "monitor {string} is named {string}")]
fn monitor_named(world: &mut HeraldWorld, monitor_id: String, monitor_name: String) {
    world.directory.push(MonitorDirectoryEntry {
        monitor_id,
        monitor_name,
    });
}

#[given(expr = "monitor {string} reported heartbeats {string}")]
fn monitor_heartbeats(world: &mut HeraldWorld, monitor_id: String, codes: String) {
    let beats = codes
        .split(',')
        .map(|code| Heartbeat {
            status: Some(code.trim().parse().expect("heartbeat code")),
        })
        .collect();
    world.heartbeats.insert(monitor_id, beats);
}

#[when("the statuses are reconciled")]
fn statuses_reconciled(world: &mut HeraldWorld) {
    world.snapshot = Some(reconcile(
        &world.directory,
        &world.heartbeats,
        &world.services,
    ));
}

#[then(expr = "service {string} is {string}")]
fn service_is(world: &mut HeraldWorld, service_id: String, status: String) {
    let snapshot = world.snapshot.as_ref().expect("snapshot not reconciled");
    assert_eq!(snapshot.get(&service_id), Some(parse_status(&status)));
}

#[then(expr = "the snapshot has {int} entries")]
fn snapshot_entries(world: &mut HeraldWorld, count: usize) {
    let snapshot = world.snapshot.as_ref().expect("snapshot not reconciled");
    assert_eq!(snapshot.len(), count);
}

#[then(expr = "the presence line is {string}")]
fn presence_line(world: &mut HeraldWorld, expected: String) {
    let snapshot = world.snapshot.as_ref().expect("snapshot not reconciled");
    assert_eq!(summary_line(&world.services, snapshot, 128), expected);
}
