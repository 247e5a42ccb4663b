use tracing::{debug, warn};

use pwachat_core::id;
use pwachat_core::types::{StoredMessage, UserKey};
use pwachat_protocol::EventPayload;
use pwachat_push::PushPayload;

use super::state::{ClientHandle, UserState};
use super::Relay;

const PUSH_TITLE: &str = "New message";
const PUSH_TAG: &str = "pwa-chat";
const PUSH_BODY_LIMIT: usize = 100;

/// Stamp the next seq, buffer, serialize once, and hand the frame to every
/// live client. A per-client failure is logged and skipped; the socket's
/// close handler performs the cleanup.
pub(crate) fn fan_out(state: &mut UserState, payload: EventPayload) -> u64 {
    let seq = state.next_seq();
    let event = payload.into_event(seq);
    let frame = serde_json::to_string(&event).unwrap_or_default();
    state.buffer_event(event);
    for client in &state.clients {
        if !client.send_raw(frame.clone()) {
            debug!(connection_id = %client.connection_id, seq, "client send failed, skipping");
        }
    }
    seq
}

/// Stamp + buffer like a broadcast, but deliver to a single client only.
/// Used for the history snapshot and streaming snapshot of a full sync.
pub(crate) fn send_buffered(state: &mut UserState, client: &ClientHandle, payload: EventPayload) -> u64 {
    let seq = state.next_seq();
    let event = payload.into_event(seq);
    state.buffer_event(event.clone());
    client.send_event(&event);
    seq
}

impl Relay {
    /// Fan an event out to all live clients of a user. Advances the seq and
    /// appends to the replay buffer even with zero clients connected.
    pub async fn broadcast(&self, user: &UserKey, payload: EventPayload) -> u64 {
        let entry = self.user_state(user);
        let mut state = entry.lock().await;
        fan_out(&mut state, payload)
    }

    /// Persist and broadcast an assistant-authored message for `target`
    /// (either a bare user key or `pwa-chat:<userKey>`); fire a push
    /// notification when no client of the user is connected.
    pub async fn push_outbound_message(&self, target: &str, text: &str, media_url: Option<String>) {
        let user = UserKey::from_target(target);
        let msg = StoredMessage::assistant(id::next_message_id("out"), text, media_url);

        // A failed write must not stop the broadcast already in flight.
        if let Err(e) = self.history.append_message(&user, msg.clone()) {
            warn!(user = %user, error = %e, "failed to persist outbound message");
        }

        let client_count = {
            let entry = self.user_state(&user);
            let mut state = entry.lock().await;
            fan_out(&mut state, EventPayload::Message { msg });
            state.client_count()
        };

        if client_count == 0 {
            self.push
                .send_push(
                    &user.format(),
                    PushPayload {
                        title: PUSH_TITLE.to_string(),
                        body: truncate_body(text),
                        tag: PUSH_TAG.to_string(),
                    },
                )
                .await;
        }
    }
}

/// First 100 chars of the text, with an ellipsis only when truncated.
fn truncate_body(text: &str) -> String {
    let preview: String = text.chars().take(PUSH_BODY_LIMIT).collect();
    if text.chars().count() > PUSH_BODY_LIMIT {
        format!("{preview}…")
    } else {
        preview
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_body_has_no_ellipsis() {
        assert_eq!(truncate_body("hello there"), "hello there");
    }

    #[test]
    fn long_body_is_cut_at_100_chars() {
        let long = "x".repeat(150);
        let body = truncate_body(&long);
        assert_eq!(body.chars().count(), 101);
        assert!(body.ends_with('…'));
    }

    #[test]
    fn body_at_exactly_100_chars_is_untouched() {
        let exact = "y".repeat(100);
        assert_eq!(truncate_body(&exact), exact);
    }
}
