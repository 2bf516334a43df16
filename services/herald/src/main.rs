//! Herald CLI
//!
//! Command-line entry point for the service status and announcement bot.

use std::path::PathBuf;

use clap::Parser;
use herald::{load_config, Config};
use tracing::Level;

#[derive(Parser)]
#[command(name = "herald")]
#[command(about = "Relays Uptime Kuma service status and owner announcements to chat servers")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Dashboard port (overrides config file)
    #[arg(long)]
    dashboard_port: Option<u16>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: Level,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(args.log_level)
        .init();

    let mut config = if let Some(config_path) = &args.config {
        load_config(config_path)?
    } else {
        tracing::info!("No --config given, using the stock service list");
        Config::default()
    };

    if let Some(dashboard_port) = args.dashboard_port {
        config.dashboard.port = dashboard_port;
    }
    // tokens from the environment win over the file
    config.resolve_secrets()?;

    match &config.uptime_kuma {
        Some(kuma) => tracing::info!(
            "Tracking {} services on {} every {}s",
            config.services.len(),
            kuma.status_page_url(),
            config.polling_interval_seconds
        ),
        None => tracing::info!(
            "Tracking {} services without a monitor endpoint",
            config.services.len()
        ),
    }
    tracing::debug!(
        "Settings at {:?}, announcements {}, webhook listener {}",
        config.settings_path,
        if config.discord.is_some() { "enabled" } else { "disabled" },
        if config.webhook.enabled { "enabled" } else { "disabled" }
    );

    herald::run(config).await?;

    Ok(())
}
