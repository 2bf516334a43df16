//! Service status and snapshot types

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::TrackedService;

/// Reported state of a tracked service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceStatus {
    Online,
    Offline,
    Maintenance,
}

impl ServiceStatus {
    /// Map an Uptime Kuma heartbeat code; anything unrecognised is offline
    pub fn from_heartbeat_code(code: i64) -> Self {
        match code {
            1 => ServiceStatus::Online,
            2 => ServiceStatus::Maintenance,
            _ => ServiceStatus::Offline,
        }
    }

    /// Single-glyph indicator used in the presence line
    pub fn indicator(&self) -> &'static str {
        match self {
            ServiceStatus::Online => "✅",
            ServiceStatus::Offline => "❌",
            ServiceStatus::Maintenance => "🔧",
        }
    }

    /// Indicator plus label, as shown on the dashboard
    pub fn label(&self) -> String {
        format!("{} {}", self.indicator(), self)
    }
}

impl fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceStatus::Online => write!(f, "Online"),
            ServiceStatus::Offline => write!(f, "Offline"),
            ServiceStatus::Maintenance => write!(f, "Maintenance"),
        }
    }
}

/// Complete status of every tracked service, keyed by service id.
///
/// A snapshot is never edited in place once published; the poller builds a
/// new one each cycle and swaps it in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatusSnapshot(BTreeMap<String, ServiceStatus>);

impl StatusSnapshot {
    pub fn new(statuses: BTreeMap<String, ServiceStatus>) -> Self {
        Self(statuses)
    }

    /// Every service offline; used when nothing better is known
    pub fn all_offline(services: &[TrackedService]) -> Self {
        Self(
            services
                .iter()
                .map(|s| (s.id.clone(), ServiceStatus::Offline))
                .collect(),
        )
    }

    pub fn get(&self, service_id: &str) -> Option<ServiceStatus> {
        self.0.get(service_id).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, ServiceStatus)> {
        self.0.iter().map(|(id, status)| (id.as_str(), *status))
    }

    pub fn service_ids(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}
