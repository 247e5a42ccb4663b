use pwachat_core::types::{ImageAttachment, StoredMessage};
use serde::{Deserialize, Serialize};

/// Client → server events. Consumed on arrival, never stored.
///
/// Wire: `{"type":"message","text":"hi","images":[...]}` / `{"type":"ping"}`
/// / `{"type":"resync"}`. Unknown or malformed frames fail to parse and are
/// ignored by the connection loop.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    Message {
        text: String,
        #[serde(default)]
        images: Vec<ImageAttachment>,
    },
    Ping,
    Resync,
}

/// Server → client events. Every variant except `Pong` consumes a sequence
/// number at emission time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    Hello {
        #[serde(rename = "connectionId")]
        connection_id: String,
        seq: u64,
    },
    History {
        messages: Vec<StoredMessage>,
        seq: u64,
    },
    Message {
        msg: StoredMessage,
        seq: u64,
    },
    Streaming {
        text: String,
        seq: u64,
    },
    StreamingEnd {
        seq: u64,
    },
    Pong,
}

impl ServerEvent {
    /// The sequence number this event consumed, if any.
    pub fn seq(&self) -> Option<u64> {
        match self {
            ServerEvent::Hello { seq, .. }
            | ServerEvent::History { seq, .. }
            | ServerEvent::Message { seq, .. }
            | ServerEvent::Streaming { seq, .. }
            | ServerEvent::StreamingEnd { seq } => Some(*seq),
            ServerEvent::Pong => None,
        }
    }
}

/// A seq-less event body; the broadcaster stamps the seq at emission time.
#[derive(Debug, Clone)]
pub enum EventPayload {
    History { messages: Vec<StoredMessage> },
    Message { msg: StoredMessage },
    Streaming { text: String },
    StreamingEnd,
}

impl EventPayload {
    pub fn into_event(self, seq: u64) -> ServerEvent {
        match self {
            EventPayload::History { messages } => ServerEvent::History { messages, seq },
            EventPayload::Message { msg } => ServerEvent::Message { msg, seq },
            EventPayload::Streaming { text } => ServerEvent::Streaming { text, seq },
            EventPayload::StreamingEnd => ServerEvent::StreamingEnd { seq },
        }
    }
}
