//! Error types for the queue source.

use thiserror::Error;

/// Errors from a queue transport.
#[derive(Error, Debug)]
pub enum QueueError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Queue transport error: {0}")]
    Transport(String),
}

/// Errors yielded inline by the queue source.
///
/// Neither variant ends the sequence; the next pull proceeds as usual.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Queue pull failed: {0}")]
    Transport(#[from] QueueError),

    #[error("Malformed queue payload: {source} (payload: {payload})")]
    Parse {
        payload: String,
        #[source]
        source: serde_json::Error,
    },
}

impl SourceError {
    /// Whether the error came from the transport rather than the payload.
    pub fn is_transport(&self) -> bool {
        matches!(self, SourceError::Transport(_))
    }
}
