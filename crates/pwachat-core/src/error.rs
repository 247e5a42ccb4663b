use thiserror::Error;

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("configuration error: {0}")]
    Config(String),

    /// `agent::runtime()` was called before the host installed a runtime.
    #[error("agent runtime not installed")]
    AgentNotInstalled,

    #[error("agent dispatch failed: {0}")]
    AgentDispatch(String),

    #[error("listener error: {0}")]
    Listener(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, RelayError>;
