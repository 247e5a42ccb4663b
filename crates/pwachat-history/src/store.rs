use std::fs;
use std::path::PathBuf;

use serde::Serialize;
use tracing::warn;

use pwachat_core::config::HISTORY_LIMIT;
use pwachat_core::types::{sanitize, StoredMessage, UserKey, DEFAULT_SESSION};

use crate::error::Result;

/// Summary row returned by [`HistoryStore::list_sessions`].
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    #[serde(rename = "sessionId")]
    pub session_id: String,
    #[serde(rename = "messageCount")]
    pub message_count: usize,
    #[serde(rename = "lastTimestamp")]
    pub last_timestamp: i64,
}

/// Bounded per-user message log: one JSON file per sanitized user key under
/// a single directory.
///
/// Writes are whole-file rewrites and not crash-atomic; a torn write reads
/// back as an empty history on the next start. Concurrent access is
/// serialized per user by the relay's per-user lock, so the store itself
/// carries no locking.
pub struct HistoryStore {
    dir: PathBuf,
}

impl HistoryStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn file_for(&self, user: &UserKey) -> PathBuf {
        self.dir.join(format!("{}.json", user.sanitized()))
    }

    /// Read a user's log. Missing or unreadable files yield an empty history.
    pub fn read_history(&self, user: &UserKey) -> Vec<StoredMessage> {
        let path = self.file_for(user);
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(_) => return Vec::new(),
        };
        match serde_json::from_str(&raw) {
            Ok(messages) => messages,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "unreadable history file, treating as empty");
                Vec::new()
            }
        }
    }

    /// Append one message, evicting from the front past the cap.
    pub fn append_message(&self, user: &UserKey, msg: StoredMessage) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let mut messages = self.read_history(user);
        messages.push(msg);
        if messages.len() > HISTORY_LIMIT {
            let excess = messages.len() - HISTORY_LIMIT;
            messages.drain(..excess);
        }
        let encoded = serde_json::to_string_pretty(&messages)?;
        fs::write(self.file_for(user), encoded)?;
        Ok(())
    }

    /// Enumerate the sessions persisted for a base user, most recently
    /// active first. The session id is recovered from the file name, so it
    /// is the sanitized form of whatever the client supplied.
    pub fn list_sessions(&self, base_user_id: &str) -> Vec<SessionSummary> {
        let base = sanitize(base_user_id);
        let prefix = format!("{base}_");
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(_) => return Vec::new(),
        };

        let mut sessions = Vec::new();
        for entry in entries.flatten() {
            let name = entry.file_name();
            let Some(stem) = name.to_str().and_then(|n| n.strip_suffix(".json")) else {
                continue;
            };
            let session_id = if stem == base {
                DEFAULT_SESSION.to_string()
            } else if let Some(rest) = stem.strip_prefix(&prefix) {
                rest.to_string()
            } else {
                continue;
            };

            let messages: Vec<StoredMessage> = fs::read_to_string(entry.path())
                .ok()
                .and_then(|raw| serde_json::from_str(&raw).ok())
                .unwrap_or_default();
            sessions.push(SessionSummary {
                session_id,
                last_timestamp: messages.last().map(|m| m.timestamp).unwrap_or(0),
                message_count: messages.len(),
            });
        }

        sessions.sort_by(|a, b| b.last_timestamp.cmp(&a.last_timestamp));
        sessions
    }

    /// Delete one session's log. Returns whether a file existed.
    pub fn delete_session(&self, base_user_id: &str, session_id: &str) -> bool {
        let user = UserKey::new(base_user_id, session_id);
        let path = self.file_for(&user);
        match fs::remove_file(&path) {
            Ok(()) => true,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to delete session history");
                false
            }
        }
    }
}
