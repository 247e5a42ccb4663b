use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::join_all;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{PushError, Result};
use crate::keys::ServerIdentity;
use crate::store::{PushSubscription, SubscriptionStore};

/// What the notification shows.
#[derive(Debug, Clone, Serialize)]
pub struct PushPayload {
    pub title: String,
    pub body: String,
    pub tag: String,
}

/// Send-only delivery capability. The vendor push wire protocol lives
/// outside the relay; implementations signal a dead subscription with
/// [`PushError::Gone`] so it gets pruned.
#[async_trait]
pub trait PushTransport: Send + Sync {
    async fn deliver(&self, subscription: &PushSubscription, payload: &PushPayload) -> Result<()>;
}

/// Fire-and-forget notification fan-out with gone-subscription cleanup.
pub struct PushSink {
    store: SubscriptionStore,
    identity: ServerIdentity,
    transport: Arc<dyn PushTransport>,
}

impl PushSink {
    pub fn new(dir: impl Into<PathBuf>, transport: Arc<dyn PushTransport>) -> Self {
        let dir = dir.into();
        Self {
            store: SubscriptionStore::new(&dir),
            identity: ServerIdentity::new(&dir),
            transport,
        }
    }

    pub fn subscribe(&self, user_key: &str, subscription: PushSubscription) -> Result<()> {
        self.store.subscribe(user_key, subscription)
    }

    pub fn unsubscribe(&self, user_key: &str, endpoint: &str) -> Result<bool> {
        self.store.unsubscribe(user_key, endpoint)
    }

    /// The server identity public key clients subscribe with.
    pub fn public_key(&self) -> Result<String> {
        self.identity.public_key()
    }

    /// Deliver to every subscription of the user concurrently. "Gone"
    /// endpoints are pruned once the whole batch has settled; any other
    /// failure keeps the subscription and is only logged.
    pub async fn send_push(&self, user_key: &str, payload: PushPayload) {
        let subs = self.store.subscriptions_for(user_key);
        if subs.is_empty() {
            return;
        }

        let results = join_all(
            subs.iter()
                .map(|sub| self.transport.deliver(sub, &payload)),
        )
        .await;

        let mut gone = Vec::new();
        for (sub, result) in subs.iter().zip(results) {
            match result {
                Ok(()) => {}
                Err(PushError::Gone { .. }) => gone.push(sub.endpoint.clone()),
                Err(e) => {
                    warn!(endpoint = %sub.endpoint, error = %e, "push delivery failed, keeping subscription");
                }
            }
        }

        if !gone.is_empty() {
            debug!(user = %user_key, pruned = gone.len(), "removing gone push subscriptions");
            if let Err(e) = self.store.prune(user_key, &gone) {
                warn!(user = %user_key, error = %e, "failed to prune push subscriptions");
            }
        }
    }
}
