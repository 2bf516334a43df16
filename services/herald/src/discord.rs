//! Discord REST client for announcements

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::broadcast::{Announcement, Announcer};
use crate::config::DiscordConfig;
use crate::io::HttpClient;

/// Sends announcement embeds through the Discord HTTP API
pub struct DiscordAnnouncer {
    api_base: String,
    authorization: String,
    http: Arc<dyn HttpClient>,
}

impl std::fmt::Debug for DiscordAnnouncer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscordAnnouncer")
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl DiscordAnnouncer {
    pub fn new(config: &DiscordConfig, http: Arc<dyn HttpClient>) -> Self {
        tracing::debug!("Created DiscordAnnouncer for {}", config.api_base);
        Self {
            api_base: config.api_base.trim_end_matches('/').to_string(),
            authorization: format!("Bot {}", config.token),
            http,
        }
    }
}

/// JSON body of a create-message request carrying one embed
pub fn embed_payload(announcement: &Announcement) -> serde_json::Value {
    let mut embed = serde_json::json!({
        "title": announcement.title,
        "description": announcement.message,
        "color": announcement.color,
        "timestamp": announcement.timestamp.to_rfc3339(),
    });
    if let Some(footer) = &announcement.footer {
        embed["footer"] = serde_json::json!({ "text": footer });
    }
    serde_json::json!({ "embeds": [embed] })
}

#[async_trait]
impl Announcer for DiscordAnnouncer {
    async fn check_ready(&self) -> crate::Result<()> {
        let url = format!("{}/users/@me", self.api_base);
        let response = self
            .http
            .get(&url, &[("Authorization", self.authorization.as_str())])
            .await
            .map_err(|e| crate::HeraldError::Platform(e.to_string()))?;

        if response.status != 200 {
            return Err(crate::HeraldError::Platform(format!(
                "session check returned status {}",
                response.status
            )));
        }
        Ok(())
    }

    async fn send(&self, channel_id: u64, announcement: &Announcement) -> crate::Result<()> {
        let url = format!("{}/channels/{}/messages", self.api_base, channel_id);
        let body = embed_payload(announcement).to_string();

        tracing::debug!("Sending announcement '{}' to channel {}", announcement.title, channel_id);

        let response = self
            .http
            .post_json(&url, &[("Authorization", self.authorization.as_str())], &body)
            .await
            .map_err(|e| crate::HeraldError::Platform(e.to_string()))?;

        if !response.is_success() {
            return Err(crate::HeraldError::Platform(format!(
                "Discord API returned status {}: {}",
                response.status, response.body
            )));
        }
        Ok(())
    }
}

/// Block until `announcer` reports ready, checking every `retry`.
/// Returns false if cancelled first.
pub async fn wait_until_ready(
    announcer: &dyn Announcer,
    retry: Duration,
    cancel: &CancellationToken,
) -> bool {
    loop {
        match announcer.check_ready().await {
            Ok(()) => {
                tracing::info!("Chat session ready");
                return true;
            }
            Err(e) => tracing::warn!("Chat session not ready: {}", e),
        }

        tokio::select! {
            _ = tokio::time::sleep(retry) => {}
            _ = cancel.cancelled() => return false,
        }
    }
}
