//! One invocation per inbound user message: build the agent context, stream
//! agent output back through the relay, then flush whatever the agent left
//! behind if it never signaled a final reply.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use pwachat_core::agent::{self, PeerInfo, ReplyEvent};
use pwachat_core::types::{ImageAttachment, StoredMessage, UserKey};
use pwachat_core::{id, RelayConfig};
use pwachat_protocol::EventPayload;

use crate::app::AppState;
use crate::relay::Relay;

/// The browser channel runs a single account.
pub const DEFAULT_ACCOUNT_ID: &str = "default";

const CHANNEL: &str = "pwa-chat";
const REPLY_CHANNEL_CAPACITY: usize = 64;

/// Entry point for a client `message` event: local echo (persist +
/// broadcast), then drive the agent in a background task. Empty messages
/// are dropped before any side effect.
pub async fn handle_user_message(
    state: &Arc<AppState>,
    user: &UserKey,
    text: String,
    images: Vec<ImageAttachment>,
) {
    let text = text.trim().to_string();
    if text.is_empty() && images.is_empty() {
        return;
    }

    let msg = StoredMessage::user(id::next_message_id("in"), &text, &images);
    if let Err(e) = state.relay.history().append_message(user, msg.clone()) {
        warn!(user = %user, error = %e, "failed to persist inbound message");
    }
    state.relay.broadcast(user, EventPayload::Message { msg }).await;

    let relay = Arc::clone(&state.relay);
    let config = state.config.clone();
    let user = user.clone();
    tokio::spawn(async move {
        dispatch_inbound(relay, &config, &user, DEFAULT_ACCOUNT_ID, text, images).await;
    });
}

/// Drive the agent for one user message. Blocks accumulate into the
/// streaming text; a final (or the safety flush) becomes the outbound
/// assistant message followed by `streaming_end`.
pub async fn dispatch_inbound(
    relay: Arc<Relay>,
    config: &RelayConfig,
    user: &UserKey,
    account_id: &str,
    text: String,
    images: Vec<ImageAttachment>,
) {
    let runtime = match agent::runtime() {
        Ok(runtime) => runtime,
        Err(e) => {
            warn!(user = %user, error = %e, "inbound message dropped");
            return;
        }
    };

    let peer = PeerInfo {
        channel: CHANNEL.to_string(),
        user_key: user.format(),
    };
    let route = runtime.resolve_route(config, account_id, &peer);
    let envelope = runtime.format_envelope(&text, &images);
    let ctx = match runtime
        .finalize_context(route, account_id, envelope, images)
        .await
    {
        Ok(ctx) => ctx,
        Err(e) => {
            warn!(user = %user, error = %e, "failed to build inbound context");
            return;
        }
    };

    // Best-effort; the reply flow does not depend on session metadata.
    if let Err(e) = runtime.record_session(&ctx).await {
        debug!(user = %user, error = %e, "session metadata not recorded");
    }

    let (reply_tx, mut reply_rx) = mpsc::channel::<ReplyEvent>(REPLY_CHANNEL_CAPACITY);
    let dispatch_user = user.clone();
    let dispatch_task = tokio::spawn(async move {
        if let Err(e) = runtime.dispatch(ctx, reply_tx).await {
            warn!(user = %dispatch_user, error = %e, "agent dispatch failed");
        }
        // reply_tx dropped here; the consumer loop below sees the close.
    });

    let mut accumulated = String::new();
    let mut final_delivered = false;

    while let Some(event) = reply_rx.recv().await {
        apply_reply(&relay, user, event, &mut accumulated, &mut final_delivered).await;
    }
    let _ = dispatch_task.await;

    // Safety flush: the agent went quiet without an explicit final.
    if !final_delivered && !accumulated.is_empty() {
        debug!(user = %user, "flushing reply the agent never finalized");
        relay
            .push_outbound_message(&user.format(), &accumulated, None)
            .await;
        relay.end_streaming(user).await;
    }
}

async fn apply_reply(
    relay: &Arc<Relay>,
    user: &UserKey,
    event: ReplyEvent,
    accumulated: &mut String,
    final_delivered: &mut bool,
) {
    match event {
        ReplyEvent::Block { text } => {
            if text.is_empty() {
                return;
            }
            accumulated.push_str(&text);
            relay.set_streaming_text(user, accumulated).await;
        }
        ReplyEvent::Final { text } => {
            accumulated.push_str(&text);
            *final_delivered = true;
            if !accumulated.is_empty() {
                relay
                    .push_outbound_message(&user.format(), accumulated, None)
                    .await;
                relay.end_streaming(user).await;
            }
        }
        ReplyEvent::Error { message } => {
            warn!(user = %user, error = %message, "agent reported dispatch error");
        }
    }
}
