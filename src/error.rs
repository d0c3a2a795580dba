use thiserror::Error as ThisError;

/// Startup failures of the feed. Runtime connectivity problems never surface
/// here; they are retried by the connection manager.
#[derive(ThisError, Debug)]
pub enum FeedError {
    #[error("Invalid endpoint address: {0}")]
    InvalidEndpoint(String),

    #[error("Reconnect delay must be greater than zero")]
    InvalidReconnectDelay,

    #[error("Connection manager has been stopped")]
    Stopped,

    #[error(transparent)]
    IoError(#[from] std::io::Error),

    #[error(transparent)]
    SerdeJsonError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, FeedError>;
