//! Uptime Kuma status page client

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use crate::config::UptimeKumaConfig;
use crate::io::HttpClient;

/// One monitor listed on the status page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorDirectoryEntry {
    pub monitor_id: String,
    pub monitor_name: String,
}

/// Monitors in the order the status page lists them
pub type MonitorDirectory = Vec<MonitorDirectoryEntry>;

/// A single heartbeat; only the status code is of interest
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Heartbeat {
    #[serde(default)]
    pub status: Option<i64>,
}

/// Heartbeats per monitor id, oldest first
pub type HeartbeatFeed = HashMap<String, Vec<Heartbeat>>;

/// What a fetch cycle produced
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Fetched {
        directory: MonitorDirectory,
        heartbeats: HeartbeatFeed,
    },
    /// The directory loaded but heartbeats did not; every service is offline
    AllOffline,
}

/// Source of monitor directory and heartbeat data
#[async_trait]
pub trait StatusSource: Send + Sync + std::fmt::Debug {
    async fn fetch(&self) -> crate::Result<FetchOutcome>;
}

#[derive(Debug, Deserialize)]
struct StatusPageResponse {
    #[serde(rename = "publicGroupList", default)]
    public_group_list: Vec<PublicGroup>,
}

#[derive(Debug, Deserialize)]
struct PublicGroup {
    #[serde(rename = "monitorList", default)]
    monitor_list: Vec<MonitorListEntry>,
}

#[derive(Debug, Deserialize)]
struct MonitorListEntry {
    #[serde(default)]
    id: serde_json::Value,
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct HeartbeatResponse {
    #[serde(rename = "heartbeatList", default)]
    heartbeat_list: HeartbeatFeed,
}

/// Client for a single Uptime Kuma status page
pub struct UptimeKumaClient {
    status_page_url: String,
    heartbeat_url: String,
    http: Arc<dyn HttpClient>,
}

impl std::fmt::Debug for UptimeKumaClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UptimeKumaClient")
            .field("status_page_url", &self.status_page_url)
            .finish()
    }
}

impl UptimeKumaClient {
    pub fn new(config: &UptimeKumaConfig, http: Arc<dyn HttpClient>) -> Self {
        let base = config.base_url.trim_end_matches('/');
        let status_page_url = format!("{}/api/status-page/{}", base, config.slug);
        let heartbeat_url = format!("{}/api/status-page/heartbeat/{}", base, config.slug);

        tracing::debug!("Created UptimeKumaClient for {}", status_page_url);

        Self {
            status_page_url,
            heartbeat_url,
            http,
        }
    }

    async fn fetch_directory(&self) -> crate::Result<MonitorDirectory> {
        tracing::debug!("Fetching status page {}", self.status_page_url);
        let response = self.http.get(&self.status_page_url, &[]).await?;
        if response.status != 200 {
            return Err(crate::HeraldError::Fetch(format!(
                "status page returned HTTP {}",
                response.status
            )));
        }

        let parsed: StatusPageResponse = serde_json::from_str(&response.body)
            .map_err(|e| crate::HeraldError::Fetch(format!("malformed status page: {}", e)))?;

        let directory: MonitorDirectory = parsed
            .public_group_list
            .into_iter()
            .flat_map(|group| group.monitor_list)
            .filter_map(|entry| {
                let monitor_id = match entry.id {
                    serde_json::Value::Number(n) => n.to_string(),
                    serde_json::Value::String(s) => s,
                    _ => return None,
                };
                if monitor_id.is_empty() || entry.name.is_empty() {
                    return None;
                }
                Some(MonitorDirectoryEntry {
                    monitor_id,
                    monitor_name: entry.name,
                })
            })
            .collect();

        tracing::debug!("Found {} monitors", directory.len());
        Ok(directory)
    }

    async fn fetch_heartbeats(&self) -> crate::Result<HeartbeatFeed> {
        tracing::debug!("Fetching heartbeats {}", self.heartbeat_url);
        let response = self.http.get(&self.heartbeat_url, &[]).await?;
        if response.status != 200 {
            return Err(crate::HeraldError::Fetch(format!(
                "heartbeat feed returned HTTP {}",
                response.status
            )));
        }

        let parsed: HeartbeatResponse = serde_json::from_str(&response.body)
            .map_err(|e| crate::HeraldError::Fetch(format!("malformed heartbeat feed: {}", e)))?;
        Ok(parsed.heartbeat_list)
    }
}

#[async_trait]
impl StatusSource for UptimeKumaClient {
    async fn fetch(&self) -> crate::Result<FetchOutcome> {
        let directory = self.fetch_directory().await?;

        match self.fetch_heartbeats().await {
            Ok(heartbeats) => Ok(FetchOutcome::Fetched {
                directory,
                heartbeats,
            }),
            Err(e) => {
                tracing::warn!("Heartbeat fetch failed, reporting all offline: {}", e);
                Ok(FetchOutcome::AllOffline)
            }
        }
    }
}
