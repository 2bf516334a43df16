//! Announcements and their fan-out to subscribed servers

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::TrackedService;
use crate::settings::SettingsStore;

const ANNOUNCE_COMMAND: &str = "!announce";
const ANNOUNCEMENT_COLOR: u32 = 0xF1C40F;

/// An announcement ready to be rendered by a chat platform
#[derive(Debug, Clone, PartialEq)]
pub struct Announcement {
    pub title: String,
    pub message: String,
    pub footer: Option<String>,
    pub color: u32,
    pub timestamp: DateTime<Utc>,
}

impl Announcement {
    pub fn new(message: impl Into<String>, service: Option<&TrackedService>) -> Self {
        let title = match service {
            Some(service) => format!("📢 Announcement for {}", service.name),
            None => "📢 Announcement".to_string(),
        };
        Self {
            title,
            message: message.into(),
            footer: service.map(|s| format!("{} {}", s.emoji, s.name)),
            color: ANNOUNCEMENT_COLOR,
            timestamp: Utc::now(),
        }
    }
}

/// Trait for delivering announcements to a channel
#[async_trait]
pub trait Announcer: Send + Sync + std::fmt::Debug {
    /// Succeeds once the platform session accepts requests
    async fn check_ready(&self) -> crate::Result<()>;

    async fn send(&self, channel_id: u64, announcement: &Announcement) -> crate::Result<()>;
}

/// A parsed `!announce [service] message` command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnounceCommand {
    pub service_id: Option<String>,
    pub message: String,
}

/// Parse the owner's text command. The first word selects a service only if
/// it is a tracked service id and more text follows it.
pub fn parse_announce(text: &str, services: &[TrackedService]) -> Option<AnnounceCommand> {
    let mut parts = text.splitn(2, ' ');
    let command = parts.next()?;
    if !command.eq_ignore_ascii_case(ANNOUNCE_COMMAND) {
        return None;
    }
    let rest = parts.next()?.trim();
    if rest.is_empty() {
        return None;
    }

    let mut words = rest.splitn(2, ' ');
    let first = words.next().unwrap_or_default().to_lowercase();
    if let Some(message) = words.next().map(str::trim).filter(|m| !m.is_empty()) {
        if services.iter().any(|s| s.id == first) {
            return Some(AnnounceCommand {
                service_id: Some(first),
                message: message.to_string(),
            });
        }
    }

    Some(AnnounceCommand {
        service_id: None,
        message: rest.to_string(),
    })
}

/// How many channels an announcement reached
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BroadcastReport {
    pub sent: u32,
    pub failed: u32,
}

/// Send `announcement` to every server subscribed to `service_id`.
/// Failures are counted and never stop the fan-out.
pub async fn broadcast(
    store: &SettingsStore,
    announcer: &dyn Announcer,
    announcement: &Announcement,
    service_id: Option<&str>,
) -> BroadcastReport {
    let mut report = BroadcastReport::default();

    for (server_id, channel_id) in store.subscribers(service_id).await {
        match announcer.send(channel_id, announcement).await {
            Ok(()) => report.sent += 1,
            Err(e) => {
                tracing::warn!(
                    "Failed to send announcement to server {} channel {}: {}",
                    server_id,
                    channel_id,
                    e
                );
                report.failed += 1;
            }
        }
    }

    tracing::info!(
        "Announcement sent to {} servers ({} failures)",
        report.sent,
        report.failed
    );
    report
}
