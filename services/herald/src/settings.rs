//! Per-server announcement settings persisted as one JSON document

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

/// One server's entry in the settings file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub programs: Option<Vec<String>>,
}

/// The whole settings file, keyed by server id
pub type SettingsDocument = BTreeMap<String, ServerRecord>;

/// Resolved settings for one server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerSettings {
    pub channel_id: Option<u64>,
    pub subscribed_services: BTreeSet<String>,
}

/// A settings change requested by a server admin
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum SettingsAction {
    SetChannel { channel_id: u64 },
    ToggleService { service_id: String },
}

/// Settings store backed by a JSON file.
///
/// Every mutation builds the complete new document, writes it to a temporary
/// file and renames it over the old one; the in-memory copy only changes once
/// the write succeeded.
#[derive(Debug)]
pub struct SettingsStore {
    path: PathBuf,
    service_ids: Vec<String>,
    document: Mutex<SettingsDocument>,
    /// Set when the file on disk could not be loaded and must not be
    /// overwritten; every mutation fails with this reason
    write_block: Option<String>,
}

impl SettingsStore {
    /// Open the store at `path`. A missing file yields an empty store. A
    /// file that does not parse is moved aside to `*.corrupt` so the next
    /// write cannot destroy it; an unreadable file, or one that cannot be
    /// moved, leaves the store read-only.
    pub async fn open(path: impl Into<PathBuf>, service_ids: Vec<String>) -> Self {
        let path = path.into();
        let (document, write_block) = match load_document(&path).await {
            Ok(document) => (document, None),
            Err(LoadError::Unreadable(e)) => {
                tracing::warn!("Could not read settings file {:?}: {}", path, e);
                (
                    SettingsDocument::new(),
                    Some(format!("settings file {:?} is unreadable: {}", path, e)),
                )
            }
            Err(LoadError::Malformed(e)) => {
                tracing::warn!("Settings file {:?} is not valid, starting empty: {}", path, e);
                let block = quarantine(&path).await.err().map(|e| {
                    format!(
                        "settings file {:?} is malformed and could not be moved aside: {}",
                        path, e
                    )
                });
                (SettingsDocument::new(), block)
            }
        };
        tracing::debug!(
            "Loaded settings for {} servers from {:?}",
            document.len(),
            path
        );
        Self {
            path,
            service_ids,
            document: Mutex::new(document),
            write_block,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Settings for `server_id`, or the defaults when it was never configured
    pub async fn get(&self, server_id: &str) -> ServerSettings {
        let document = self.document.lock().await;
        self.resolve(document.get(server_id))
    }

    pub async fn set_channel(
        &self,
        server_id: &str,
        channel_id: u64,
    ) -> crate::Result<ServerSettings> {
        self.apply(server_id, SettingsAction::SetChannel { channel_id })
            .await
    }

    pub async fn toggle_subscription(
        &self,
        server_id: &str,
        service_id: &str,
    ) -> crate::Result<ServerSettings> {
        self.apply(
            server_id,
            SettingsAction::ToggleService {
                service_id: service_id.to_string(),
            },
        )
        .await
    }

    /// Apply one action and persist the whole document
    pub async fn apply(
        &self,
        server_id: &str,
        action: SettingsAction,
    ) -> crate::Result<ServerSettings> {
        if let SettingsAction::ToggleService { service_id } = &action {
            if !self.service_ids.contains(service_id) {
                return Err(crate::HeraldError::InvalidRequest(format!(
                    "unknown service '{}'",
                    service_id
                )));
            }
        }
        if let Some(reason) = &self.write_block {
            return Err(crate::HeraldError::Persistence(reason.clone()));
        }

        let mut document = self.document.lock().await;
        let mut updated = document.clone();
        let record = updated.entry(server_id.to_string()).or_default();

        match &action {
            SettingsAction::SetChannel { channel_id } => {
                record.channel = Some(*channel_id);
            }
            SettingsAction::ToggleService { service_id } => {
                let programs = record
                    .programs
                    .get_or_insert_with(|| self.service_ids.clone());
                if let Some(pos) = programs.iter().position(|p| p == service_id) {
                    programs.remove(pos);
                } else {
                    programs.push(service_id.clone());
                }
            }
        }

        save_document(&self.path, &updated).await?;
        tracing::debug!("Applied {:?} for server {}", action, server_id);

        let settings = self.resolve(updated.get(server_id));
        *document = updated;
        Ok(settings)
    }

    /// `(server_id, channel_id)` of every server with a channel that should
    /// receive an announcement for `service` (all of them when `None`)
    pub async fn subscribers(&self, service: Option<&str>) -> Vec<(String, u64)> {
        let document = self.document.lock().await;
        document
            .iter()
            .filter_map(|(server_id, record)| {
                let channel = record.channel?;
                let subscribed = match (service, &record.programs) {
                    (None, _) | (Some(_), None) => true,
                    (Some(service), Some(programs)) => programs.iter().any(|p| p == service),
                };
                subscribed.then(|| (server_id.clone(), channel))
            })
            .collect()
    }

    fn resolve(&self, record: Option<&ServerRecord>) -> ServerSettings {
        let channel_id = record.and_then(|r| r.channel);
        let subscribed_services = match record.and_then(|r| r.programs.as_ref()) {
            Some(programs) => programs.iter().cloned().collect(),
            None => self.service_ids.iter().cloned().collect(),
        };
        ServerSettings {
            channel_id,
            subscribed_services,
        }
    }
}

enum LoadError {
    Unreadable(std::io::Error),
    Malformed(serde_json::Error),
}

async fn load_document(path: &Path) -> Result<SettingsDocument, LoadError> {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(SettingsDocument::new()),
        Err(e) => return Err(LoadError::Unreadable(e)),
    };
    if content.trim().is_empty() {
        return Ok(SettingsDocument::new());
    }
    serde_json::from_str(&content).map_err(LoadError::Malformed)
}

/// Rename a malformed settings file to `<name>.corrupt`
async fn quarantine(path: &Path) -> std::io::Result<()> {
    let target = path.with_extension("json.corrupt");
    tokio::fs::rename(path, &target).await?;
    tracing::warn!("Moved malformed settings file to {:?}", target);
    Ok(())
}

/// Write the document to a sibling temp file, then rename it into place
async fn save_document(path: &Path, document: &SettingsDocument) -> crate::Result<()> {
    let persistence = |e: std::io::Error| {
        crate::HeraldError::Persistence(format!("writing {:?}: {}", path, e))
    };

    let content = serde_json::to_string_pretty(document)?;
    let temp_path = path.with_extension("json.tmp");
    tokio::fs::write(&temp_path, content)
        .await
        .map_err(persistence)?;
    tokio::fs::rename(&temp_path, path)
        .await
        .map_err(persistence)?;

    tracing::debug!("Settings saved to {:?}", path);
    Ok(())
}
