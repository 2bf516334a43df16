//! Herald - community chat bot for self-hosted service status
//!
//! Polls an Uptime Kuma status page, keeps a cached status snapshot, derives a
//! presence line from it and relays owner announcements to subscribed servers.

pub mod aggregator;
pub mod broadcast;
pub mod config;
pub mod dashboard;
pub mod discord;
pub mod engine;
pub mod error;
pub mod io;
pub mod kuma;
pub mod presence;
pub mod settings;
pub mod state;
pub mod status;
pub mod webhook;

pub use config::{load_config, Config};
pub use error::{HeraldError, Result};

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tokio_util::sync::CancellationToken;

use crate::broadcast::Announcer;
use crate::dashboard::DashboardState;
use crate::discord::{wait_until_ready, DiscordAnnouncer};
use crate::engine::Engine;
use crate::io::{HttpClient, ReqwestHttpClient};
use crate::kuma::{StatusSource, UptimeKumaClient};
use crate::presence::StatePresence;
use crate::settings::SettingsStore;

const READY_RETRY: Duration = Duration::from_secs(5);

/// Run the herald service with the given configuration
pub async fn run(config: Config) -> Result<()> {
    let timeout = config
        .uptime_kuma
        .as_ref()
        .map(|kuma| kuma.timeout_seconds)
        .unwrap_or(10);
    let http: Arc<dyn HttpClient> =
        Arc::new(ReqwestHttpClient::with_timeout(Duration::from_secs(timeout))?);
    let cancel = CancellationToken::new();

    let source: Option<Arc<dyn StatusSource>> = match &config.uptime_kuma {
        Some(kuma) => Some(Arc::new(UptimeKumaClient::new(kuma, Arc::clone(&http)))),
        None => {
            tracing::error!(
                "No Uptime Kuma endpoint configured; every service will be reported offline"
            );
            None
        }
    };

    let state = state::new_state_handle();
    let engine = Arc::new(Engine::new(
        source,
        config.services.clone(),
        Arc::new(StatePresence::new(Arc::clone(&state))),
        config.presence_max_len,
        state,
        cancel.clone(),
    ));

    let settings = Arc::new(
        SettingsStore::open(
            config.settings_path.clone(),
            config.services.iter().map(|s| s.id.clone()).collect(),
        )
        .await,
    );

    let announcer: Option<Arc<dyn Announcer>> = match &config.discord {
        Some(discord) => Some(Arc::new(DiscordAnnouncer::new(discord, Arc::clone(&http)))),
        None => {
            tracing::warn!("No Discord token configured; announcements are disabled");
            None
        }
    };

    // Setup shutdown handler
    let cancel_for_signal = cancel.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for ctrl-c: {}", e);
            return;
        }
        tracing::info!("Shutdown signal received");
        cancel_for_signal.cancel();
    });

    if config.dashboard.enabled {
        let router = dashboard::build_router(DashboardState {
            engine: Arc::clone(&engine),
            settings: Arc::clone(&settings),
            announcer: announcer.clone(),
            announce_token: config.dashboard.announce_token.clone(),
            status_page_url: config.uptime_kuma.as_ref().map(|k| k.status_page_url()),
        });
        spawn_server("Dashboard", config.dashboard.port, router, cancel.clone());
    }

    if config.webhook.enabled {
        if config.webhook.secret.is_none() {
            tracing::warn!("Webhook listener has no secret; pushes are not verified");
        }
        let router = webhook::build_router(&config.webhook);
        spawn_server("Webhook listener", config.webhook.port, router, cancel.clone());
    }

    tracing::info!("Herald started");

    let ready = session_ready(announcer, cancel.clone());
    engine
        .run(
            ready,
            Duration::from_secs(config.polling_interval_seconds.max(1)),
        )
        .await;

    tracing::info!("Herald stopped");
    Ok(())
}

/// Resolves once the chat session accepts requests, or at once without one
fn session_ready(
    announcer: Option<Arc<dyn Announcer>>,
    cancel: CancellationToken,
) -> impl Future<Output = ()> {
    async move {
        if let Some(announcer) = announcer {
            if !wait_until_ready(announcer.as_ref(), READY_RETRY, &cancel).await {
                // cancelled; let the engine observe it
                cancel.cancelled().await;
            }
        }
    }
}

fn spawn_server(name: &'static str, port: u16, router: Router, cancel: CancellationToken) {
    tokio::spawn(async move {
        let addr = SocketAddr::from(([0, 0, 0, 0], port));
        tracing::info!("{} listening on http://{}", name, addr);

        let listener = match tokio::net::TcpListener::bind(addr).await {
            Ok(l) => l,
            Err(e) => {
                tracing::error!(
                    "Failed to bind {} to port {}: {}. Continuing without it.",
                    name,
                    port,
                    e
                );
                return;
            }
        };

        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                cancel.cancelled().await;
            })
            .await
            .ok();

        tracing::debug!("{} stopped", name);
    });
}
