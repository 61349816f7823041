//! Queue transport abstraction.

use async_trait::async_trait;

use crate::error::QueueError;

/// Destructive blocking pop from a named queue.
#[async_trait]
pub trait QueueTransport: Send {
    /// Wait until a message is available and remove it from the queue.
    ///
    /// Returns `Ok(None)` only when the transport is closed for good.
    async fn pop(&mut self) -> Result<Option<String>, QueueError>;

    /// Number of messages still waiting.
    async fn len(&mut self) -> Result<u64, QueueError>;

    /// Queue name, for logging.
    fn name(&self) -> &str;
}
