//! Handshake and reconnect protocol: adopt-or-mint the connection id, emit
//! `hello`, then either replay the buffered window (catch-up) or send the
//! full history (full sync).

use tokio::sync::mpsc;
use tracing::{debug, info};
use uuid::Uuid;

use pwachat_core::types::UserKey;
use pwachat_protocol::{EventPayload, ServerEvent};

use super::broadcast::send_buffered;
use super::state::{ClientHandle, UserState};
use super::Relay;

impl Relay {
    /// Register a client socket and run the handshake. Returns the
    /// connection id the client must present on reconnect.
    ///
    /// `incoming` is the `(connection_id, sequence_number)` pair of a
    /// reconnecting client. The id is adopted — and buffered events with
    /// `seq >= sequence_number` replayed — only while the replay buffer
    /// still covers that seq; otherwise a fresh id is minted and the client
    /// gets the authoritative history snapshot.
    pub async fn register_client(
        &self,
        user: &UserKey,
        incoming: Option<(String, u64)>,
        sender: mpsc::UnboundedSender<String>,
    ) -> String {
        let entry = self.user_state(user);
        let mut state = entry.lock().await;

        let (connection_id, catch_up_from) = match incoming {
            Some((id, seq)) if !id.is_empty() && state.buffer_covers(seq) => (id, Some(seq)),
            _ => (Uuid::new_v4().to_string(), None),
        };

        let client = ClientHandle::new(connection_id.clone(), sender);
        state.add_client(client.clone());

        // hello consumes a seq but is never buffered: it is meaningless to
        // any other connection.
        let hello = ServerEvent::Hello {
            connection_id: connection_id.clone(),
            seq: state.next_seq(),
        };
        client.send_event(&hello);

        match catch_up_from {
            Some(from) => {
                let replay = state.replay_from(from);
                debug!(user = %user, from, events = replay.len(), "catch-up replay");
                for event in replay {
                    client.send_event(&event);
                }
            }
            None => self.full_sync(&mut state, &client, user),
        }

        info!(user = %user, connection_id = %connection_id, resync = catch_up_from.is_none(), "client registered");
        connection_id
    }

    /// Client-requested resync: same emissions as a full sync, without a new
    /// hello.
    pub async fn resync_client(&self, user: &UserKey, connection_id: &str) {
        let entry = self.user_state(user);
        let mut state = entry.lock().await;
        let Some(client) = state.client(connection_id).cloned() else {
            return;
        };
        self.full_sync(&mut state, &client, user);
    }

    /// Unregister at socket termination. Safe to call for an id that is
    /// already gone.
    pub async fn drop_client(&self, user: &UserKey, connection_id: &str) {
        let entry = self.user_state(user);
        let mut state = entry.lock().await;
        state.remove_client(connection_id);
        info!(user = %user, connection_id = %connection_id, remaining = state.client_count(), "client dropped");
    }

    /// History snapshot plus the current partial reply, both seq-stamped and
    /// buffered, delivered to one client. The client treats the result as
    /// authoritative state.
    fn full_sync(&self, state: &mut UserState, client: &ClientHandle, user: &UserKey) {
        let messages = self.history.read_history(user);
        send_buffered(state, client, EventPayload::History { messages });
        if let Some(text) = state.streaming.as_ref().map(|s| s.text.clone()) {
            send_buffered(state, client, EventPayload::Streaming { text });
        }
    }
}
