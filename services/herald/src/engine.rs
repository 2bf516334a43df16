//! Engine: polls the status source, caches snapshots, publishes presence

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::aggregator::reconcile;
use crate::config::TrackedService;
use crate::kuma::{FetchOutcome, StatusSource};
use crate::presence::{activity_for, PresencePublisher};
use crate::state::StateHandle;
use crate::status::StatusSnapshot;

/// How a single polling tick ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// A fresh snapshot replaced the cache
    Updated,
    /// The fetch failed and the previous snapshot was kept
    Retained,
    /// The fetch failed on a cold cache; every service is offline
    Fallback,
}

/// The engine is the only writer of the cached snapshot
pub struct Engine {
    source: Option<Arc<dyn StatusSource>>,
    services: Vec<TrackedService>,
    presence: Arc<dyn PresencePublisher>,
    presence_max_len: usize,
    state: StateHandle,
    poll_lock: Mutex<()>,
    cancel: CancellationToken,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("source", &self.source)
            .field("services", &self.services.len())
            .finish()
    }
}

impl Engine {
    /// `source` is `None` when no monitor endpoint is configured; every tick
    /// then behaves like a failed fetch.
    pub fn new(
        source: Option<Arc<dyn StatusSource>>,
        services: Vec<TrackedService>,
        presence: Arc<dyn PresencePublisher>,
        presence_max_len: usize,
        state: StateHandle,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            source,
            services,
            presence,
            presence_max_len,
            state,
            poll_lock: Mutex::new(()),
            cancel,
        }
    }

    pub fn services(&self) -> &[TrackedService] {
        &self.services
    }

    pub fn state(&self) -> &StateHandle {
        &self.state
    }

    /// Run one polling cycle: fetch, update the cache, publish presence
    pub async fn tick(&self) -> TickOutcome {
        let _guard = self.poll_lock.lock().await;
        self.tick_locked().await
    }

    /// Current snapshot. A cold cache triggers one synchronous poll so the
    /// caller always gets a complete snapshot.
    pub async fn current_snapshot(&self) -> Arc<StatusSnapshot> {
        {
            let state = self.state.read().await;
            if !state.is_cold() {
                return state.snapshot();
            }
        }

        let _guard = self.poll_lock.lock().await;
        // another caller may have polled while we waited for the lock
        if self.state.read().await.is_cold() {
            tracing::debug!("Status cache is cold, polling on demand");
            self.tick_locked().await;
        }
        self.state.read().await.snapshot()
    }

    async fn tick_locked(&self) -> TickOutcome {
        let fetched = match &self.source {
            Some(source) => source.fetch().await.map(|outcome| match outcome {
                FetchOutcome::Fetched {
                    directory,
                    heartbeats,
                } => reconcile(&directory, &heartbeats, &self.services),
                FetchOutcome::AllOffline => StatusSnapshot::all_offline(&self.services),
            }),
            None => Err(crate::HeraldError::Config(
                "no status source configured".to_string(),
            )),
        };
        let now_ms = current_epoch_ms();

        let (outcome, snapshot) = {
            let mut state = self.state.write().await;
            let outcome = match fetched {
                Ok(snapshot) => {
                    state.replace_snapshot(snapshot, now_ms);
                    TickOutcome::Updated
                }
                Err(e) => {
                    if self.source.is_some() {
                        tracing::debug!("Status fetch failed: {}", e);
                    }
                    if state.record_failure(&self.services, now_ms) {
                        TickOutcome::Fallback
                    } else {
                        TickOutcome::Retained
                    }
                }
            };
            (outcome, state.snapshot())
        };

        match outcome {
            TickOutcome::Updated => tracing::debug!("Status updated: {:?}", snapshot),
            // without a source the startup error already said why
            TickOutcome::Retained if self.source.is_none() => {}
            TickOutcome::Retained => {
                tracing::warn!("Status fetch failed, keeping last known status")
            }
            TickOutcome::Fallback => {
                tracing::warn!("Status fetch failed with no cached status, showing all offline")
            }
        }

        let activity = activity_for(&self.services, &snapshot, self.presence_max_len);
        self.presence.publish(&activity).await;

        outcome
    }

    /// Wait for `ready`, then poll every `interval` until cancelled
    pub async fn run<F>(&self, ready: F, interval: Duration)
    where
        F: Future<Output = ()>,
    {
        tokio::select! {
            _ = ready => {
                tracing::debug!("Session ready, starting status polling");
            }
            _ = self.cancel.cancelled() => {
                tracing::debug!("Cancelled before session became ready");
                return;
            }
        }

        loop {
            self.tick().await;

            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = self.cancel.cancelled() => {
                    tracing::debug!("Polling loop cancelled");
                    break;
                }
            }
        }
    }
}

fn current_epoch_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
