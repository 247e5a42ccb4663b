use thiserror::Error;

#[derive(Debug, Error)]
pub enum PushError {
    /// The push service reports the subscription no longer exists; the
    /// caller prunes it from the store.
    #[error("subscription gone: {endpoint}")]
    Gone { endpoint: String },

    #[error("push delivery failed: {0}")]
    Delivery(String),

    #[error("push store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("push store encode error: {0}")]
    Encode(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PushError>;
