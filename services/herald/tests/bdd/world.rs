//! BDD test world for herald service

use std::collections::VecDeque;
use std::sync::atomic::AtomicU32;
use std::sync::{Arc, Mutex};

use cucumber::World;
use herald::config::TrackedService;
use herald::engine::{Engine, TickOutcome};
use herald::kuma::{FetchOutcome, HeartbeatFeed, MonitorDirectory};
use herald::settings::{ServerSettings, SettingsStore};
use herald::status::StatusSnapshot;

#[derive(Debug, Default, World)]
pub struct HeraldWorld {
    pub services: Vec<TrackedService>,

    // Aggregation testing
    pub directory: MonitorDirectory,
    pub heartbeats: HeartbeatFeed,
    pub snapshot: Option<StatusSnapshot>,

    // Polling testing
    pub script: Arc<Mutex<VecDeque<herald::Result<FetchOutcome>>>>,
    pub fetch_count: Arc<AtomicU32>,
    pub engine: Option<Engine>,
    pub last_outcome: Option<TickOutcome>,
    pub held_snapshot: Option<Arc<StatusSnapshot>>,

    // Settings testing
    pub settings_dir: Option<tempfile::TempDir>,
    pub store: Option<SettingsStore>,
    pub settings: Option<ServerSettings>,
    pub settings_error: Option<herald::HeraldError>,
}

impl HeraldWorld {
    pub fn service_ids(&self) -> Vec<String> {
        self.services.iter().map(|s| s.id.clone()).collect()
    }
}
