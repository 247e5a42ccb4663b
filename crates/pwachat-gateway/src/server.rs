//! Listener: bind once, upgrade `/ws`, expose the push registration and
//! health routes, serve until the shutdown token fires. Everything else
//! falls through to a 404.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::info;

use pwachat_core::error::{RelayError, Result};

use crate::app::AppState;

/// Assemble the axum router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(crate::http::health::health_handler))
        .route("/ws", get(crate::ws::connection::ws_handler))
        .route("/push/subscribe", post(crate::http::push::subscribe_handler))
        .route(
            "/push/unsubscribe",
            post(crate::http::push::unsubscribe_handler),
        )
        .route(
            "/push/public-key",
            get(crate::http::push::public_key_handler),
        )
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Bind and serve until `shutdown` is cancelled. Returns immediately when
/// the channel is disabled in config. In-flight dispatches are dropped
/// best-effort with the connections.
pub async fn run(state: Arc<AppState>, shutdown: CancellationToken) -> Result<()> {
    let channel = &state.config.channels.pwa_chat;
    if !channel.enabled {
        info!("pwa-chat channel disabled, not starting");
        return Ok(());
    }

    let addr: SocketAddr = state
        .config
        .bind_addr()
        .parse()
        .map_err(|e| RelayError::Listener(format!("invalid bind address: {e}")))?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| RelayError::Listener(format!("bind {addr} failed: {e}")))?;
    info!(%addr, "pwa-chat relay listening");

    // Forward the caller's token to the per-connection loops so open
    // sockets close instead of keeping the graceful shutdown pending.
    let connections = state.shutdown.clone();
    let external = shutdown.clone();
    tokio::spawn(async move {
        external.cancelled().await;
        connections.cancel();
    });

    let router = build_router(state);
    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move { shutdown.cancelled().await })
    .await
    .map_err(|e| RelayError::Listener(e.to_string()))
}
