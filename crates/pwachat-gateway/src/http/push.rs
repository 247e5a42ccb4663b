//! Push subscription registration endpoints.
//!
//! All three routes sit behind the same gate as the WebSocket upgrade;
//! rejected HTTP callers get 401 JSON.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{ConnectInfo, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json};
use serde::Deserialize;
use tracing::warn;

use pwachat_core::types::UserKey;
use pwachat_push::PushSubscription;

use crate::app::AppState;
use crate::auth;

#[derive(Deserialize)]
pub struct SubscribeBody {
    #[serde(rename = "userId", default = "default_id")]
    pub user_id: String,
    #[serde(rename = "sessionId", default = "default_id")]
    pub session_id: String,
    pub subscription: PushSubscription,
}

#[derive(Deserialize)]
pub struct UnsubscribeBody {
    #[serde(rename = "userId", default = "default_id")]
    pub user_id: String,
    #[serde(rename = "sessionId", default = "default_id")]
    pub session_id: String,
    pub endpoint: String,
}

fn default_id() -> String {
    "default".to_string()
}

/// POST /push/subscribe — upsert a subscription for the user key.
pub async fn subscribe_handler(
    State(state): State<Arc<AppState>>,
    ConnectInfo(remote): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(body): Json<SubscribeBody>,
) -> impl IntoResponse {
    if let Err(e) = require_auth(&state, &headers, remote) {
        return e.into_response();
    }

    let user = UserKey::new(&body.user_id, &body.session_id);
    match state.push.subscribe(&user.format(), body.subscription) {
        Ok(()) => Json(serde_json::json!({ "status": "ok" })).into_response(),
        Err(e) => {
            warn!(user = %user, error = %e, "push subscribe failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": e.to_string() })),
            )
                .into_response()
        }
    }
}

/// POST /push/unsubscribe — drop a subscription by endpoint.
pub async fn unsubscribe_handler(
    State(state): State<Arc<AppState>>,
    ConnectInfo(remote): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(body): Json<UnsubscribeBody>,
) -> impl IntoResponse {
    if let Err(e) = require_auth(&state, &headers, remote) {
        return e.into_response();
    }

    let user = UserKey::new(&body.user_id, &body.session_id);
    match state.push.unsubscribe(&user.format(), &body.endpoint) {
        Ok(removed) => {
            Json(serde_json::json!({ "status": "ok", "removed": removed })).into_response()
        }
        Err(e) => {
            warn!(user = %user, error = %e, "push unsubscribe failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": e.to_string() })),
            )
                .into_response()
        }
    }
}

/// GET /push/public-key — the server identity key clients subscribe with.
pub async fn public_key_handler(
    State(state): State<Arc<AppState>>,
    ConnectInfo(remote): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> impl IntoResponse {
    if let Err(e) = require_auth(&state, &headers, remote) {
        return e.into_response();
    }

    match state.push.public_key() {
        Ok(public_key) => Json(serde_json::json!({ "publicKey": public_key })).into_response(),
        Err(e) => {
            warn!(error = %e, "failed to load push identity keys");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": e.to_string() })),
            )
                .into_response()
        }
    }
}

fn require_auth(
    state: &AppState,
    headers: &HeaderMap,
    remote: SocketAddr,
) -> Result<(), (StatusCode, Json<serde_json::Value>)> {
    if auth::is_authorized(&state.config, headers, remote, None) {
        Ok(())
    } else {
        Err((
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({ "error": "unauthorized" })),
        ))
    }
}
