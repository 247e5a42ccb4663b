mod broadcast;
mod connect;
mod state;
mod streaming;

pub use state::{ClientHandle, StreamingState, UserState};

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;

use pwachat_core::types::UserKey;
use pwachat_history::HistoryStore;
use pwachat_push::PushSink;

/// Per-user relay engine: sequencing, replay buffer, fan-out broadcast,
/// streaming state, reconnect handshake.
pub struct Relay {
    history: HistoryStore,
    push: Arc<PushSink>,
    /// One entry per user key seen since process start. Entries are never
    /// evicted, so the map grows with the number of distinct keys.
    users: DashMap<String, Arc<Mutex<UserState>>>,
}

impl Relay {
    pub fn new(history: HistoryStore, push: Arc<PushSink>) -> Self {
        Self {
            history,
            push,
            users: DashMap::new(),
        }
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    /// Look up or lazily create the state for a user key. The returned lock
    /// serializes every seq assignment, buffer append, and client hand-off
    /// for that user.
    pub fn user_state(&self, user: &UserKey) -> Arc<Mutex<UserState>> {
        self.users
            .entry(user.format())
            .or_insert_with(|| Arc::new(Mutex::new(UserState::new())))
            .clone()
    }

    /// Number of user keys with in-memory state.
    pub fn user_count(&self) -> usize {
        self.users.len()
    }
}
