//! Shared state for the cached status snapshot and published presence

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::RwLock;

use crate::config::TrackedService;
use crate::presence::Activity;
use crate::status::StatusSnapshot;

/// Shared state accessible by the poller, dashboard and presence publisher
#[derive(Debug)]
pub struct SharedState {
    snapshot: Arc<StatusSnapshot>,
    pub last_poll_epoch_ms: u64,
    pub consecutive_failures: u32,
    pub presence: Option<Activity>,
    pub started_at: Instant,
}

impl Default for SharedState {
    fn default() -> Self {
        Self::new()
    }
}

impl SharedState {
    pub fn new() -> Self {
        Self {
            snapshot: Arc::new(StatusSnapshot::default()),
            last_poll_epoch_ms: 0,
            consecutive_failures: 0,
            presence: None,
            started_at: Instant::now(),
        }
    }

    /// Current snapshot; cheap to clone and immune to later swaps
    pub fn snapshot(&self) -> Arc<StatusSnapshot> {
        Arc::clone(&self.snapshot)
    }

    /// True until the first poll has populated the cache
    pub fn is_cold(&self) -> bool {
        self.snapshot.is_empty()
    }

    /// Swap in the result of a successful poll
    pub fn replace_snapshot(&mut self, snapshot: StatusSnapshot, now_ms: u64) {
        self.snapshot = Arc::new(snapshot);
        self.last_poll_epoch_ms = now_ms;
        self.consecutive_failures = 0;
    }

    /// Record a failed poll. The previous snapshot is kept unless the cache
    /// was never populated, in which case every service becomes offline.
    /// Returns true when the all-offline fallback was applied.
    pub fn record_failure(&mut self, services: &[TrackedService], now_ms: u64) -> bool {
        self.last_poll_epoch_ms = now_ms;
        self.consecutive_failures += 1;
        if self.snapshot.is_empty() {
            self.snapshot = Arc::new(StatusSnapshot::all_offline(services));
            true
        } else {
            false
        }
    }
}

/// Thread-safe shared state handle
pub type StateHandle = Arc<RwLock<SharedState>>;

pub fn new_state_handle() -> StateHandle {
    Arc::new(RwLock::new(SharedState::new()))
}
