//! Presence line derived from the status snapshot

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::TrackedService;
use crate::state::StateHandle;
use crate::status::StatusSnapshot;

const SEPARATOR: &str = " | ";
const ELLIPSIS: char = '…';

/// Kind of activity shown next to the bot's name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    Playing,
    Watching,
    Listening,
}

/// An always-on presence indicator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
    pub kind: ActivityKind,
    pub name: String,
}

/// Trait for publishing the bot's presence
#[async_trait]
pub trait PresencePublisher: Send + Sync + std::fmt::Debug {
    async fn publish(&self, activity: &Activity);
}

/// Build the presence line: `{icon}{indicator}` per service joined by ` | `,
/// cut to at most `max_len` characters.
pub fn summary_line(
    services: &[TrackedService],
    snapshot: &StatusSnapshot,
    max_len: usize,
) -> String {
    let line = services
        .iter()
        .filter_map(|service| {
            snapshot
                .get(&service.id)
                .map(|status| format!("{}{}", service.emoji, status.indicator()))
        })
        .collect::<Vec<_>>()
        .join(SEPARATOR);
    truncate_chars(&line, max_len)
}

/// Watching activity for the current snapshot
pub fn activity_for(
    services: &[TrackedService],
    snapshot: &StatusSnapshot,
    max_len: usize,
) -> Activity {
    Activity {
        kind: ActivityKind::Watching,
        name: summary_line(services, snapshot, max_len),
    }
}

fn truncate_chars(line: &str, max_len: usize) -> String {
    if line.chars().count() <= max_len {
        return line.to_string();
    }
    if max_len == 0 {
        return String::new();
    }
    let mut cut: String = line.chars().take(max_len - 1).collect();
    cut.push(ELLIPSIS);
    cut
}

/// Publishes presence into shared state, where the dashboard serves it
#[derive(Debug)]
pub struct StatePresence {
    state: StateHandle,
}

impl StatePresence {
    pub fn new(state: StateHandle) -> Self {
        Self { state }
    }
}

#[async_trait]
impl PresencePublisher for StatePresence {
    async fn publish(&self, activity: &Activity) {
        tracing::info!("Presence: {:?} {}", activity.kind, activity.name);
        self.state.write().await.presence = Some(activity.clone());
    }
}
