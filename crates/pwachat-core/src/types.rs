use serde::{Deserialize, Serialize};

/// Session discriminator that maps to the bare base user id.
pub const DEFAULT_SESSION: &str = "default";

/// Conversation role of a stored message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// A single persisted chat message. Created on user send or on the agent's
/// final reply; never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredMessage {
    pub id: String,
    pub text: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    pub role: Role,
    #[serde(rename = "mediaUrl", skip_serializing_if = "Option::is_none")]
    pub media_url: Option<String>,
    #[serde(rename = "hasImages", skip_serializing_if = "Option::is_none")]
    pub has_images: Option<bool>,
    #[serde(rename = "imageCount", skip_serializing_if = "Option::is_none")]
    pub image_count: Option<usize>,
}

impl StoredMessage {
    /// A user-authored message, carrying image metadata when any were sent.
    pub fn user(id: impl Into<String>, text: impl Into<String>, images: &[ImageAttachment]) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            timestamp: now_millis(),
            role: Role::User,
            media_url: None,
            has_images: (!images.is_empty()).then_some(true),
            image_count: (!images.is_empty()).then_some(images.len()),
        }
    }

    /// An assistant-authored message, optionally pointing at served media.
    pub fn assistant(
        id: impl Into<String>,
        text: impl Into<String>,
        media_url: Option<String>,
    ) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            timestamp: now_millis(),
            role: Role::Assistant,
            media_url,
            has_images: None,
            image_count: None,
        }
    }
}

/// Inline image payload attached to an inbound client message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageAttachment {
    /// Wire discriminator; always `"image"`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Base64-encoded image bytes.
    pub data: String,
    #[serde(rename = "mimeType")]
    pub mime_type: String,
}

/// Per-conversation identity: a base user id plus a session discriminator.
///
/// The canonical string is the base id alone for the `"default"` session,
/// otherwise `base:session`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UserKey {
    pub user_id: String,
    pub session_id: String,
}

impl UserKey {
    pub fn new(user_id: impl Into<String>, session_id: impl Into<String>) -> Self {
        let session_id: String = session_id.into();
        Self {
            user_id: user_id.into(),
            session_id: if session_id.is_empty() {
                DEFAULT_SESSION.to_string()
            } else {
                session_id
            },
        }
    }

    /// Return the canonical string form.
    pub fn format(&self) -> String {
        if self.session_id == DEFAULT_SESSION {
            self.user_id.clone()
        } else {
            format!("{}:{}", self.user_id, self.session_id)
        }
    }

    /// Parse a canonical string, splitting at the first `:`. A bare id maps
    /// to the default session; parsing never fails.
    pub fn parse(s: &str) -> Self {
        match s.split_once(':') {
            Some((user_id, session_id)) => Self::new(user_id, session_id),
            None => Self::new(s, DEFAULT_SESSION),
        }
    }

    /// Parse an outbound target, stripping the channel prefix callers may
    /// carry (`pwa-chat:<userKey>`).
    pub fn from_target(target: &str) -> Self {
        Self::parse(target.strip_prefix("pwa-chat:").unwrap_or(target))
    }

    /// File-name-safe form of the canonical string.
    pub fn sanitized(&self) -> String {
        sanitize(&self.format())
    }
}

impl std::fmt::Display for UserKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.format())
    }
}

/// Replace every character outside `[A-Za-z0-9_-]` with `_`.
pub fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
