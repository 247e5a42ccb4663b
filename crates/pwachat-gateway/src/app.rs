use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use pwachat_core::{agent, config, RelayConfig};
use pwachat_history::HistoryStore;
use pwachat_push::{PushSink, PushTransport};

use crate::relay::Relay;

/// Central shared state — passed as `Arc<AppState>` to all axum handlers.
pub struct AppState {
    pub config: RelayConfig,
    pub relay: Arc<Relay>,
    pub push: Arc<PushSink>,
    /// Cancelled when the process shuts down; open connection loops watch it
    /// so sockets actually close instead of pinning the listener forever.
    pub shutdown: CancellationToken,
}

impl AppState {
    /// Build the shared state. The on-disk root is, in order: the explicit
    /// `state_dir` config value, the installed agent runtime's store path,
    /// then `$HOME/.openclaw`.
    pub fn new(config: RelayConfig, transport: Arc<dyn PushTransport>) -> Arc<Self> {
        let root = config
            .state_dir()
            .or_else(|| agent::runtime().ok().map(|rt| rt.store_path()))
            .unwrap_or_else(config::default_state_dir);

        let history = HistoryStore::new(root.join(config::HISTORY_DIR));
        let push = Arc::new(PushSink::new(root.join(config::PUSH_DIR), transport));
        let relay = Arc::new(Relay::new(history, Arc::clone(&push)));

        Arc::new(Self {
            config,
            relay,
            push,
            shutdown: CancellationToken::new(),
        })
    }
}
