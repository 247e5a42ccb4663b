use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::error::Result;

pub const SUBSCRIPTIONS_FILE: &str = "subscriptions.json";

/// Browser push subscription as delivered by the client's service worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushSubscription {
    pub endpoint: String,
    pub keys: SubscriptionKeys,
}

/// Opaque client auth material accompanying a subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionKeys {
    pub p256dh: String,
    pub auth: String,
}

/// On-disk map of user key → push subscriptions.
///
/// Every read-modify-write cycle runs under the store lock so concurrent
/// subscribe/prune calls cannot interleave on the file.
pub struct SubscriptionStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl SubscriptionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            path: dir.into().join(SUBSCRIPTIONS_FILE),
            lock: Mutex::new(()),
        }
    }

    /// Upsert by endpoint: a replayed endpoint replaces the earlier entry
    /// instead of growing the list.
    pub fn subscribe(&self, user_key: &str, subscription: PushSubscription) -> Result<()> {
        let _guard = self.lock.lock().unwrap();
        let mut map = self.load();
        let subs = map.entry(user_key.to_string()).or_default();
        subs.retain(|s| s.endpoint != subscription.endpoint);
        subs.push(subscription);
        self.save(&map)
    }

    /// Remove a subscription by endpoint. Returns whether one was removed.
    pub fn unsubscribe(&self, user_key: &str, endpoint: &str) -> Result<bool> {
        let _guard = self.lock.lock().unwrap();
        let mut map = self.load();
        let Some(subs) = map.get_mut(user_key) else {
            return Ok(false);
        };
        let before = subs.len();
        subs.retain(|s| s.endpoint != endpoint);
        let removed = subs.len() != before;
        if subs.is_empty() {
            map.remove(user_key);
        }
        if removed {
            self.save(&map)?;
        }
        Ok(removed)
    }

    pub fn subscriptions_for(&self, user_key: &str) -> Vec<PushSubscription> {
        let _guard = self.lock.lock().unwrap();
        self.load().remove(user_key).unwrap_or_default()
    }

    /// Remove endpoints the push service reported gone. Returns how many
    /// were dropped.
    pub fn prune(&self, user_key: &str, endpoints: &[String]) -> Result<usize> {
        let _guard = self.lock.lock().unwrap();
        let mut map = self.load();
        let Some(subs) = map.get_mut(user_key) else {
            return Ok(0);
        };
        let before = subs.len();
        subs.retain(|s| !endpoints.contains(&s.endpoint));
        let removed = before - subs.len();
        if subs.is_empty() {
            map.remove(user_key);
        }
        if removed > 0 {
            self.save(&map)?;
        }
        Ok(removed)
    }

    fn load(&self) -> HashMap<String, Vec<PushSubscription>> {
        fs::read_to_string(&self.path)
            .ok()
            .and_then(|raw| serde_json::from_str(&raw).ok())
            .unwrap_or_default()
    }

    fn save(&self, map: &HashMap<String, Vec<PushSubscription>>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(map)?)?;
        Ok(())
    }
}
