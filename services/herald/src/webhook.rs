//! Redeploy webhook: verifies push signatures and runs the update command

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::Router;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::config::WebhookConfig;

type HmacSha256 = Hmac<Sha256>;

const SIGNATURE_HEADER: &str = "x-hub-signature-256";
const SIGNATURE_PREFIX: &str = "sha256=";

#[derive(Debug)]
struct WebhookState {
    secret: Option<String>,
    command: Option<String>,
}

/// Build the webhook router serving `POST /update`
pub fn build_router(config: &WebhookConfig) -> Router {
    let state = Arc::new(WebhookState {
        secret: config.secret.clone(),
        command: config.command.clone(),
    });
    Router::new()
        .route("/update", post(update_handler))
        .with_state(state)
}

/// Check a `sha256=<hex>` signature of `body` against `secret`
pub fn verify_signature(secret: &str, body: &[u8], signature: &str) -> bool {
    let Some(hex_digest) = signature.strip_prefix(SIGNATURE_PREFIX) else {
        return false;
    };
    let Ok(expected) = hex::decode(hex_digest) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}

async fn update_handler(
    State(state): State<Arc<WebhookState>>,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, &'static str) {
    if let Some(secret) = &state.secret {
        let signature = headers
            .get(SIGNATURE_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        if !verify_signature(secret, &body, signature) {
            tracing::warn!("Rejected webhook with missing or invalid signature");
            return (StatusCode::UNAUTHORIZED, "Unauthorized");
        }
    }

    let Some(command) = &state.command else {
        tracing::info!("Webhook received, no update command configured");
        return (StatusCode::OK, "OK");
    };

    match spawn_command(command) {
        Ok(()) => (StatusCode::OK, "OK"),
        Err(e) => {
            tracing::error!("Failed to start update command '{}': {}", command, e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Update failed")
        }
    }
}

/// Start `command` (program followed by whitespace separated arguments)
/// and log its exit status in the background
fn spawn_command(command: &str) -> crate::Result<()> {
    let mut parts = command.split_whitespace();
    let program = parts
        .next()
        .ok_or_else(|| crate::HeraldError::Config("update command is empty".to_string()))?;

    let mut child = tokio::process::Command::new(program).args(parts).spawn()?;
    tracing::info!("Started update command '{}'", command);

    let command = command.to_string();
    tokio::spawn(async move {
        match child.wait().await {
            Ok(status) if status.success() => {
                tracing::info!("Update command '{}' finished", command)
            }
            Ok(status) => tracing::warn!("Update command '{}' exited with {}", command, status),
            Err(e) => tracing::warn!("Waiting for update command '{}' failed: {}", command, e),
        }
    });
    Ok(())
}
