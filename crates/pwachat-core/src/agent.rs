//! Capability surface of the core agent runtime the relay fronts.
//!
//! The runtime itself lives in the host process. It is installed once at
//! startup as a process-wide singleton; everything past `install` reaches it
//! through `runtime()`, which fails loudly before installation.

use std::path::PathBuf;
use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::config::RelayConfig;
use crate::error::{RelayError, Result};
use crate::types::ImageAttachment;

/// Resolved routing for one inbound message.
#[derive(Debug, Clone)]
pub struct AgentRoute {
    pub session_key: String,
    pub agent_id: String,
}

/// Peer descriptor handed to the runtime when resolving a route.
#[derive(Debug, Clone)]
pub struct PeerInfo {
    /// Always `"pwa-chat"` for this relay.
    pub channel: String,
    /// Canonical user key string of the sender.
    pub user_key: String,
}

/// Fully-built inbound context handed to `dispatch`.
#[derive(Debug, Clone)]
pub struct InboundContext {
    pub route: AgentRoute,
    pub account_id: String,
    pub envelope: String,
    pub images: Vec<ImageAttachment>,
}

/// One unit of agent output flowing back to the relay.
#[derive(Debug, Clone)]
pub enum ReplyEvent {
    /// A partial chunk; the relay accumulates and re-broadcasts the total.
    Block { text: String },
    /// The terminal chunk (possibly empty) closing the reply.
    Final { text: String },
    /// A dispatch error; logged, never surfaced to the browser.
    Error { message: String },
}

#[async_trait]
pub trait AgentRuntime: Send + Sync {
    /// Directory the runtime persists channel state under.
    fn store_path(&self) -> PathBuf;

    /// Resolve which agent/session handles a peer's messages.
    fn resolve_route(&self, config: &RelayConfig, account_id: &str, peer: &PeerInfo) -> AgentRoute;

    /// Render raw text plus attachments into the runtime's envelope format.
    fn format_envelope(&self, text: &str, images: &[ImageAttachment]) -> String;

    /// Finalize the context object handed to `dispatch`.
    async fn finalize_context(
        &self,
        route: AgentRoute,
        account_id: &str,
        envelope: String,
        images: Vec<ImageAttachment>,
    ) -> Result<InboundContext>;

    /// Record session metadata for an inbound message. Best-effort; callers
    /// swallow the error.
    async fn record_session(&self, ctx: &InboundContext) -> Result<()>;

    /// Run the agent. Reply chunks flow through `replies` as they are
    /// produced; dropping the sender marks the end of output.
    async fn dispatch(&self, ctx: InboundContext, replies: mpsc::Sender<ReplyEvent>) -> Result<()>;
}

static RUNTIME: OnceLock<Arc<dyn AgentRuntime>> = OnceLock::new();

/// Install the process-wide runtime. Called once by the host at startup.
pub fn install(runtime: Arc<dyn AgentRuntime>) -> Result<()> {
    RUNTIME
        .set(runtime)
        .map_err(|_| RelayError::Config("agent runtime already installed".to_string()))
}

/// The installed runtime.
pub fn runtime() -> Result<Arc<dyn AgentRuntime>> {
    RUNTIME.get().cloned().ok_or(RelayError::AgentNotInstalled)
}
