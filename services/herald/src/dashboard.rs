//! Web dashboard: live status page, JSON API and admin endpoints

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use subtle::ConstantTimeEq;

use crate::broadcast::{broadcast, parse_announce, Announcement, Announcer, BroadcastReport};
use crate::engine::Engine;
use crate::settings::{ServerSettings, SettingsAction, SettingsStore};

/// Dashboard application state
#[derive(Clone)]
pub struct DashboardState {
    pub engine: Arc<Engine>,
    pub settings: Arc<SettingsStore>,
    pub announcer: Option<Arc<dyn Announcer>>,
    pub announce_token: Option<String>,
    pub status_page_url: Option<String>,
}

/// Build the dashboard axum router
pub fn build_router(state: DashboardState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/api/status", get(status_handler))
        .route("/api/presence", get(presence_handler))
        .route("/api/polling", get(polling_handler))
        .route(
            "/api/settings/{server_id}",
            get(get_settings_handler).post(apply_settings_handler),
        )
        .route("/api/announce", post(announce_handler))
        .route("/health", get(health_handler))
        .with_state(state)
}

type ApiError = (StatusCode, String);

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

async fn index_handler(State(dashboard): State<DashboardState>) -> impl IntoResponse {
    let snapshot = dashboard.engine.current_snapshot().await;

    let service_rows: String = dashboard
        .engine
        .services()
        .iter()
        .filter_map(|service| snapshot.get(&service.id).map(|status| (service, status)))
        .map(|(service, status)| {
            let (color, bg) = match status {
                crate::status::ServiceStatus::Online => ("#155724", "#d4edda"),
                crate::status::ServiceStatus::Offline => ("#721c24", "#f8d7da"),
                crate::status::ServiceStatus::Maintenance => ("#856404", "#fff3cd"),
            };
            format!(
                r#"<tr style="border-bottom: 1px solid #dee2e6;">
                    <td style="padding: 0.5rem;">{} {}</td>
                    <td style="padding: 0.5rem;">{}</td>
                    <td style="padding: 0.5rem;">
                        <span style="display: inline-block; padding: 0.25em 0.6em; border-radius: 0.25rem; font-size: 0.85em; font-weight: 600; color: {}; background-color: {};">{}</span>
                    </td>
                </tr>"#,
                escape_html(&service.emoji),
                escape_html(&service.name),
                escape_html(&service.description),
                color,
                bg,
                status.label()
            )
        })
        .collect();

    let status_page_link = dashboard
        .status_page_url
        .as_ref()
        .map(|url| {
            format!(
                r#"<p>📈 <a href="{}">View detailed uptime statistics</a></p>"#,
                escape_html(url)
            )
        })
        .unwrap_or_default();

    let html = format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <meta http-equiv="refresh" content="60">
    <title>Server Status</title>
</head>
<body style="font-family: system-ui, sans-serif; max-width: 960px; margin: 0 auto; padding: 1rem;">
    <h1>📊 Server Status</h1>
    {status_page_link}
    <table style="width: 100%; border-collapse: collapse;">
        <thead>
            <tr style="border-bottom: 2px solid #dee2e6;">
                <th style="padding: 0.5rem; text-align: left;">Service</th>
                <th style="padding: 0.5rem; text-align: left;">Description</th>
                <th style="padding: 0.5rem; text-align: left;">Status</th>
            </tr>
        </thead>
        <tbody>{service_rows}</tbody>
    </table>
</body>
</html>"#,
        status_page_link = status_page_link,
        service_rows = service_rows,
    );

    Html(html)
}

async fn status_handler(State(dashboard): State<DashboardState>) -> impl IntoResponse {
    let snapshot = dashboard.engine.current_snapshot().await;

    let statuses: Vec<serde_json::Value> = dashboard
        .engine
        .services()
        .iter()
        .filter_map(|service| {
            snapshot.get(&service.id).map(|status| {
                serde_json::json!({
                    "id": service.id,
                    "name": service.name,
                    "emoji": service.emoji,
                    "status": status,
                })
            })
        })
        .collect();

    Json(statuses)
}

async fn presence_handler(State(dashboard): State<DashboardState>) -> impl IntoResponse {
    let presence = dashboard.engine.state().read().await.presence.clone();
    Json(presence)
}

async fn polling_handler(State(dashboard): State<DashboardState>) -> impl IntoResponse {
    let state = dashboard.engine.state().read().await;
    Json(serde_json::json!({
        "last_poll_epoch_ms": state.last_poll_epoch_ms,
        "consecutive_failures": state.consecutive_failures,
        "uptime_seconds": state.started_at.elapsed().as_secs(),
    }))
}

async fn get_settings_handler(
    State(dashboard): State<DashboardState>,
    Path(server_id): Path<String>,
) -> Json<ServerSettings> {
    Json(dashboard.settings.get(&server_id).await)
}

async fn apply_settings_handler(
    State(dashboard): State<DashboardState>,
    Path(server_id): Path<String>,
    Json(action): Json<SettingsAction>,
) -> Result<Json<ServerSettings>, ApiError> {
    match dashboard.settings.apply(&server_id, action).await {
        Ok(settings) => Ok(Json(settings)),
        Err(crate::HeraldError::InvalidRequest(msg)) => Err((StatusCode::BAD_REQUEST, msg)),
        Err(e) => {
            tracing::warn!("Settings update for server {} failed: {}", server_id, e);
            Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }
    }
}

/// Body of an announce request: either a structured message or the raw
/// `!announce ...` text command
#[derive(Debug, Deserialize)]
pub struct AnnounceRequest {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub service: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
}

/// Compare a presented bearer token without leaking the mismatch position
fn token_matches(presented: &str, expected: &str) -> bool {
    presented.as_bytes().ct_eq(expected.as_bytes()).into()
}

async fn announce_handler(
    State(dashboard): State<DashboardState>,
    headers: HeaderMap,
    Json(request): Json<AnnounceRequest>,
) -> Result<Json<BroadcastReport>, ApiError> {
    let Some(token) = &dashboard.announce_token else {
        return Err((
            StatusCode::FORBIDDEN,
            "announcements are disabled".to_string(),
        ));
    };
    let authorized = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .is_some_and(|presented| token_matches(presented, token));
    if !authorized {
        return Err((StatusCode::UNAUTHORIZED, "owner only".to_string()));
    }
    let Some(announcer) = &dashboard.announcer else {
        return Err((
            StatusCode::SERVICE_UNAVAILABLE,
            "no chat platform configured".to_string(),
        ));
    };

    let services = dashboard.engine.services();
    let (service_id, message) = match (request.text, request.message) {
        (Some(text), _) => {
            let command = parse_announce(&text, services).ok_or_else(|| {
                (
                    StatusCode::BAD_REQUEST,
                    "Usage: !announce <message> or !announce <service_id> <message>".to_string(),
                )
            })?;
            (command.service_id, command.message)
        }
        (None, Some(message)) if !message.trim().is_empty() => (request.service, message),
        _ => {
            return Err((
                StatusCode::BAD_REQUEST,
                "message must not be empty".to_string(),
            ))
        }
    };

    let service = match &service_id {
        Some(id) => Some(
            services
                .iter()
                .find(|s| &s.id == id)
                .ok_or_else(|| (StatusCode::BAD_REQUEST, format!("unknown service '{}'", id)))?,
        ),
        None => None,
    };

    let announcement = Announcement::new(message, service);
    let report = broadcast(
        &dashboard.settings,
        announcer.as_ref(),
        &announcement,
        service_id.as_deref(),
    )
    .await;
    Ok(Json(report))
}

async fn health_handler() -> impl IntoResponse {
    "OK"
}
