use std::collections::VecDeque;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use pwachat_core::config::EVENT_BUFFER_CAPACITY;
use pwachat_protocol::ServerEvent;

/// Handle to one connected client socket. The sender feeds the connection
/// task's outbound queue, so enqueueing never blocks and per-socket write
/// order matches enqueue order.
#[derive(Debug, Clone)]
pub struct ClientHandle {
    pub connection_id: String,
    sender: mpsc::UnboundedSender<String>,
}

impl ClientHandle {
    pub fn new(connection_id: impl Into<String>, sender: mpsc::UnboundedSender<String>) -> Self {
        Self {
            connection_id: connection_id.into(),
            sender,
        }
    }

    /// Queue a serialized frame. A failure means the connection task is gone
    /// and its close handler will unregister this client.
    pub fn send_raw(&self, frame: String) -> bool {
        self.sender.send(frame).is_ok()
    }

    pub fn send_event(&self, event: &ServerEvent) -> bool {
        let frame = serde_json::to_string(event).unwrap_or_default();
        self.send_raw(frame)
    }
}

/// A partial agent reply currently on screen.
pub struct StreamingState {
    pub text: String,
    /// Matches the inactivity timer that armed it; a stale timer firing
    /// after a re-arm sees a different epoch and does nothing.
    pub epoch: u64,
    pub timer: JoinHandle<()>,
}

/// In-memory state for one user key, exclusively owned by its mutex.
pub struct UserState {
    sequence: u64,
    buffer: VecDeque<ServerEvent>,
    streaming_epoch: u64,
    pub(crate) clients: Vec<ClientHandle>,
    pub(crate) streaming: Option<StreamingState>,
}

impl UserState {
    pub fn new() -> Self {
        Self {
            sequence: 0,
            buffer: VecDeque::new(),
            streaming_epoch: 0,
            clients: Vec::new(),
            streaming: None,
        }
    }

    /// Consume the next sequence number.
    pub fn next_seq(&mut self) -> u64 {
        let seq = self.sequence;
        self.sequence += 1;
        seq
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub(crate) fn next_streaming_epoch(&mut self) -> u64 {
        self.streaming_epoch += 1;
        self.streaming_epoch
    }

    /// Append a seq-bearing event, evicting the oldest past capacity.
    pub fn buffer_event(&mut self, event: ServerEvent) {
        self.buffer.push_back(event);
        while self.buffer.len() > EVENT_BUFFER_CAPACITY {
            self.buffer.pop_front();
        }
    }

    pub fn buffer_len(&self) -> usize {
        self.buffer.len()
    }

    pub fn buffer_min_seq(&self) -> Option<u64> {
        self.buffer.front().and_then(|e| e.seq())
    }

    pub fn buffer_max_seq(&self) -> Option<u64> {
        self.buffer.back().and_then(|e| e.seq())
    }

    /// Whether the buffer still covers `seq`, i.e. catch-up replay from it
    /// is possible.
    pub fn buffer_covers(&self, seq: u64) -> bool {
        matches!(
            (self.buffer_min_seq(), self.buffer_max_seq()),
            (Some(lo), Some(hi)) if lo <= seq && seq <= hi
        )
    }

    /// Buffered events with `seq >= from`, in buffer order.
    pub fn replay_from(&self, from: u64) -> Vec<ServerEvent> {
        self.buffer
            .iter()
            .filter(|e| e.seq().map(|s| s >= from).unwrap_or(false))
            .cloned()
            .collect()
    }

    pub fn add_client(&mut self, client: ClientHandle) {
        self.clients.push(client);
    }

    /// Remove by connection id. Called exactly once at socket termination.
    pub fn remove_client(&mut self, connection_id: &str) {
        self.clients.retain(|c| c.connection_id != connection_id);
    }

    pub fn client(&self, connection_id: &str) -> Option<&ClientHandle> {
        self.clients.iter().find(|c| c.connection_id == connection_id)
    }

    pub fn client_count(&self) -> usize {
        self.clients.len()
    }
}

impl Default for UserState {
    fn default() -> Self {
        Self::new()
    }
}
