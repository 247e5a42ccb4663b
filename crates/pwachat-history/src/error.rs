use thiserror::Error;

/// Errors that can occur while persisting a user's message log.
///
/// Reads never produce these: a missing or unreadable file is an empty
/// history by contract.
#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("history I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("history encode error: {0}")]
    Encode(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, HistoryError>;
