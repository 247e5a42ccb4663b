//! Streaming-reply state machine: at most one partial reply per user, with
//! a sliding inactivity timer that force-ends a stream the agent abandoned.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::debug;

use pwachat_core::config::STREAMING_TIMEOUT_SECS;
use pwachat_core::types::UserKey;
use pwachat_protocol::EventPayload;

use super::broadcast::fan_out;
use super::state::StreamingState;
use super::Relay;

impl Relay {
    /// Show (replace) the current partial reply and re-arm the inactivity
    /// timer. Always emits a `streaming` event — the client renders the
    /// latest text as the whole partial.
    pub async fn set_streaming_text(self: &Arc<Self>, user: &UserKey, text: &str) {
        let entry = self.user_state(user);
        let mut state = entry.lock().await;

        if let Some(prev) = state.streaming.take() {
            prev.timer.abort();
        }

        fan_out(
            &mut state,
            EventPayload::Streaming {
                text: text.to_string(),
            },
        );

        let epoch = state.next_streaming_epoch();
        let timer = spawn_timeout(Arc::clone(self), user.clone(), epoch);
        state.streaming = Some(StreamingState {
            text: text.to_string(),
            epoch,
            timer,
        });
    }

    /// Drop the streaming state and tell clients to hide the partial. A
    /// no-op when nothing is streaming, so the timeout and the final-reply
    /// path cannot both emit `streaming_end`.
    pub async fn end_streaming(&self, user: &UserKey) {
        let entry = self.user_state(user);
        let mut state = entry.lock().await;
        if let Some(prev) = state.streaming.take() {
            prev.timer.abort();
            fan_out(&mut state, EventPayload::StreamingEnd);
        }
    }

    /// Timeout path. Only acts if the streaming state still belongs to the
    /// timer that fired; a re-arm bumps the epoch and orphans this call.
    async fn streaming_timeout(&self, user: &UserKey, epoch: u64) {
        let entry = self.user_state(user);
        let mut state = entry.lock().await;
        match &state.streaming {
            Some(current) if current.epoch == epoch => {
                debug!(user = %user, "streaming reply timed out with no update");
                state.streaming = None;
                fan_out(&mut state, EventPayload::StreamingEnd);
            }
            _ => {}
        }
    }
}

fn spawn_timeout(relay: Arc<Relay>, user: UserKey, epoch: u64) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(STREAMING_TIMEOUT_SECS)).await;
        relay.streaming_timeout(&user, epoch).await;
    })
}
