//! WebSocket upgrade and per-connection event loop.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{ConnectInfo, Query, State, WebSocketUpgrade};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio::time;
use tracing::{debug, warn};

use pwachat_core::config::{KEEPALIVE_INTERVAL_SECS, MAX_PAYLOAD_BYTES};
use pwachat_core::types::UserKey;
use pwachat_protocol::{ClientEvent, ServerEvent};

use crate::app::AppState;
use crate::auth;
use crate::dispatch;

/// Query parameters accepted on the `/ws` upgrade URL.
#[derive(Debug, Deserialize)]
pub struct WsQuery {
    #[serde(rename = "userId", default = "default_id")]
    pub user_id: String,
    #[serde(rename = "sessionId", default = "default_id")]
    pub session_id: String,
    /// Previous connection id, for reconnect catch-up.
    pub connection_id: Option<String>,
    /// Last processed seq, base-10. Anything unparseable forces a full sync
    /// rather than rejecting the upgrade.
    pub sequence_number: Option<String>,
    /// Auth token alternative to the Authorization header.
    pub token: Option<String>,
}

fn default_id() -> String {
    "default".to_string()
}

impl WsQuery {
    /// The `(connection_id, seq)` pair of a reconnecting client, when both
    /// parts are usable.
    fn incoming(&self) -> Option<(String, u64)> {
        let id = self.connection_id.as_deref().filter(|s| !s.is_empty())?;
        let seq = self.sequence_number.as_deref()?.parse().ok()?;
        Some((id.to_string(), seq))
    }
}

/// Axum handler — upgrades HTTP to WebSocket at GET /ws. Rejections happen
/// before the upgrade, as a bare 401 status line.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    ConnectInfo(remote): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Query(query): Query<WsQuery>,
) -> Response {
    if !auth::is_authorized(&state.config, &headers, remote, query.token.as_deref()) {
        debug!(%remote, "ws upgrade rejected");
        return StatusCode::UNAUTHORIZED.into_response();
    }
    ws.on_upgrade(move |socket| run_connection(socket, state, query))
}

/// Per-connection loop — lives for the entire WS session.
async fn run_connection(socket: WebSocket, state: Arc<AppState>, query: WsQuery) {
    let user = UserKey::new(&query.user_id, &query.session_id);
    let (mut ws_tx, mut ws_rx) = socket.split();

    // Everything the relay emits for this socket funnels through this queue,
    // so write order matches the order established under the user lock.
    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<String>();

    let connection_id = state
        .relay
        .register_client(&user, query.incoming(), out_tx.clone())
        .await;

    let mut keepalive = time::interval(Duration::from_secs(KEEPALIVE_INTERVAL_SECS));
    keepalive.set_missed_tick_behavior(time::MissedTickBehavior::Skip);
    keepalive.tick().await; // first tick fires immediately; skip it

    loop {
        tokio::select! {
            frame = out_rx.recv() => {
                match frame {
                    Some(text) => {
                        if ws_tx.send(Message::Text(text.into())).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }

            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        if text.len() > MAX_PAYLOAD_BYTES {
                            warn!(user = %user, size = text.len(), "oversized frame ignored");
                            continue;
                        }
                        handle_client_event(&state, &user, &connection_id, &text, &out_tx).await;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        let _ = ws_tx.send(Message::Pong(data)).await;
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        debug!(user = %user, error = %e, "ws read error");
                        break;
                    }
                    _ => {}
                }
            }

            _ = keepalive.tick() => {
                if ws_tx.send(Message::Ping(Bytes::new())).await.is_err() {
                    break;
                }
            }

            _ = state.shutdown.cancelled() => {
                let _ = ws_tx.send(Message::Close(None)).await;
                break;
            }
        }
    }

    state.relay.drop_client(&user, &connection_id).await;
}

/// Process one inbound text frame. Malformed input is ignored without a
/// response and without touching the sequence counter.
async fn handle_client_event(
    state: &Arc<AppState>,
    user: &UserKey,
    connection_id: &str,
    text: &str,
    out: &mpsc::UnboundedSender<String>,
) {
    let event: ClientEvent = match serde_json::from_str(text) {
        Ok(event) => event,
        Err(e) => {
            debug!(user = %user, error = %e, "malformed client event ignored");
            return;
        }
    };

    match event {
        ClientEvent::Ping => {
            // No seq, no buffering, no user lock; only correlated with the
            // client's own ping.
            let frame = serde_json::to_string(&ServerEvent::Pong).unwrap_or_default();
            let _ = out.send(frame);
        }
        ClientEvent::Resync => {
            state.relay.resync_client(user, connection_id).await;
        }
        ClientEvent::Message { text, images } => {
            dispatch::handle_user_message(state, user, text, images).await;
        }
    }
}
