//! Configuration types for the herald service

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub uptime_kuma: Option<UptimeKumaConfig>,
    #[serde(default = "default_services")]
    pub services: Vec<TrackedService>,
    #[serde(default = "default_polling_interval")]
    pub polling_interval_seconds: u64,
    #[serde(default = "default_settings_path")]
    pub settings_path: PathBuf,
    #[serde(default = "default_presence_max_len")]
    pub presence_max_len: usize,
    #[serde(default)]
    pub dashboard: DashboardConfig,
    #[serde(default)]
    pub discord: Option<DiscordConfig>,
    #[serde(default)]
    pub webhook: WebhookConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            uptime_kuma: None,
            services: default_services(),
            polling_interval_seconds: default_polling_interval(),
            settings_path: default_settings_path(),
            presence_max_len: default_presence_max_len(),
            dashboard: DashboardConfig::default(),
            discord: None,
            webhook: WebhookConfig::default(),
        }
    }
}

/// A service the bot reports on, bound to one Uptime Kuma monitor by name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedService {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub emoji: String,
    /// Must match the monitor name shown on the status page exactly
    pub monitor_name: String,
}

/// Uptime Kuma status page endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UptimeKumaConfig {
    pub base_url: String,
    #[serde(default = "default_slug")]
    pub slug: String,
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl UptimeKumaConfig {
    /// Public status page link shown on the dashboard
    pub fn status_page_url(&self) -> String {
        format!("{}/status/{}", self.base_url.trim_end_matches('/'), self.slug)
    }
}

/// Discord bot credentials
#[derive(Clone, Serialize, Deserialize)]
pub struct DiscordConfig {
    pub token: String,
    #[serde(default = "default_discord_api_base")]
    pub api_base: String,
}

impl std::fmt::Debug for DiscordConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscordConfig")
            .field("api_base", &self.api_base)
            .finish()
    }
}

/// Dashboard configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_dashboard_port")]
    pub port: u16,
    /// Bearer token required by the announce endpoint
    #[serde(default)]
    pub announce_token: Option<String>,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: default_dashboard_port(),
            announce_token: None,
        }
    }
}

/// Redeploy webhook listener configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_webhook_port")]
    pub port: u16,
    #[serde(default)]
    pub secret: Option<String>,
    /// Program run on a verified push, e.g. an update script
    #[serde(default)]
    pub command: Option<String>,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: default_webhook_port(),
            secret: None,
            command: None,
        }
    }
}

impl Config {
    /// Overlay secrets and endpoints from the environment
    pub fn resolve_secrets(&mut self) -> crate::Result<()> {
        self.apply_env(|key| std::env::var(key).ok())
    }

    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> crate::Result<()> {
        if let Some(base_url) = lookup("UPTIME_KUMA_URL").filter(|v| !v.is_empty()) {
            match &mut self.uptime_kuma {
                Some(kuma) => kuma.base_url = base_url,
                None => {
                    self.uptime_kuma = Some(UptimeKumaConfig {
                        base_url,
                        slug: default_slug(),
                        timeout_seconds: default_timeout(),
                    })
                }
            }
        }
        if let Some(slug) = lookup("UPTIME_KUMA_STATUS_PAGE_SLUG").filter(|v| !v.is_empty()) {
            if let Some(kuma) = &mut self.uptime_kuma {
                kuma.slug = slug;
            }
        }
        if let Some(token) = lookup("DISCORD_TOKEN").filter(|v| !v.is_empty()) {
            match &mut self.discord {
                Some(discord) => discord.token = token,
                None => {
                    self.discord = Some(DiscordConfig {
                        token,
                        api_base: default_discord_api_base(),
                    })
                }
            }
        }
        if let Some(secret) = lookup("WEBHOOK_SECRET").filter(|v| !v.is_empty()) {
            self.webhook.secret = Some(secret);
        }
        if let Some(token) = lookup("ANNOUNCE_TOKEN").filter(|v| !v.is_empty()) {
            self.dashboard.announce_token = Some(token);
        }
        self.validate()
    }

    /// Reject configurations the bot cannot serve consistently
    pub fn validate(&self) -> crate::Result<()> {
        let mut seen = HashSet::new();
        for service in &self.services {
            if !seen.insert(service.id.as_str()) {
                return Err(crate::HeraldError::Config(format!(
                    "duplicate service id '{}'",
                    service.id
                )));
            }
        }
        if let Some(discord) = &self.discord {
            if discord.token.trim().is_empty() {
                return Err(crate::HeraldError::Config(
                    "discord token is empty".to_string(),
                ));
            }
        }
        Ok(())
    }

    pub fn service(&self, id: &str) -> Option<&TrackedService> {
        self.services.iter().find(|s| s.id == id)
    }
}

fn default_services() -> Vec<TrackedService> {
    vec![
        TrackedService {
            id: "quinnflix".to_string(),
            name: "Quinnflix".to_string(),
            description: "Media streaming & request service".to_string(),
            emoji: "🎬".to_string(),
            monitor_name: "Quinnflix".to_string(),
        },
        TrackedService {
            id: "vintage".to_string(),
            name: "Vintage Studio Code".to_string(),
            description: "Vintage Story game server".to_string(),
            emoji: "🎮".to_string(),
            monitor_name: "Vintage Studio Code".to_string(),
        },
        TrackedService {
            id: "sugarcraft".to_string(),
            name: "Sugarcraft".to_string(),
            description: "Minecraft server".to_string(),
            emoji: "⛏️".to_string(),
            monitor_name: "Sugarcraft".to_string(),
        },
    ]
}

fn default_polling_interval() -> u64 {
    60
}

fn default_settings_path() -> PathBuf {
    PathBuf::from("server_settings.json")
}

fn default_presence_max_len() -> usize {
    128
}

fn default_slug() -> String {
    "default".to_string()
}

fn default_timeout() -> u64 {
    10
}

fn default_discord_api_base() -> String {
    "https://discord.com/api/v10".to_string()
}

fn default_true() -> bool {
    true
}

fn default_dashboard_port() -> u16 {
    11120
}

fn default_webhook_port() -> u16 {
    5000
}

/// Load configuration from a JSON file
pub fn load_config(path: &Path) -> crate::Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        crate::HeraldError::Config(format!("Failed to read config file {:?}: {}", path, e))
    })?;
    let config: Config = serde_json::from_str(&content)?;
    Ok(config)
}
