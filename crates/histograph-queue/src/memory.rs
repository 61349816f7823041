//! In-process queue transport.

use async_trait::async_trait;
use tokio::sync::mpsc;

use histograph_types::RawEvent;

use crate::error::QueueError;
use crate::transport::QueueTransport;

/// Channel-backed queue for tests and embedding.
///
/// Dropping every [`MemoryQueueHandle`] closes the queue once the
/// remaining messages are drained.
pub struct MemoryQueue {
    name: String,
    rx: mpsc::UnboundedReceiver<String>,
}

/// Producer side of a [`MemoryQueue`].
#[derive(Clone)]
pub struct MemoryQueueHandle {
    tx: mpsc::UnboundedSender<String>,
}

impl MemoryQueue {
    /// Create a queue and its producer handle.
    pub fn new(name: impl Into<String>) -> (Self, MemoryQueueHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                name: name.into(),
                rx,
            },
            MemoryQueueHandle { tx },
        )
    }
}

impl MemoryQueueHandle {
    /// Push a raw payload. Returns false when the queue is gone.
    pub fn push_raw(&self, payload: impl Into<String>) -> bool {
        self.tx.send(payload.into()).is_ok()
    }

    /// Serialize and push an event.
    pub fn push(&self, event: &RawEvent) -> Result<bool, serde_json::Error> {
        Ok(self.push_raw(event.to_json()?))
    }
}

#[async_trait]
impl QueueTransport for MemoryQueue {
    async fn pop(&mut self) -> Result<Option<String>, QueueError> {
        Ok(self.rx.recv().await)
    }

    async fn len(&mut self) -> Result<u64, QueueError> {
        Ok(self.rx.len() as u64)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fifo_and_close() {
        let (mut queue, handle) = MemoryQueue::new("test");
        assert!(handle.push_raw("a"));
        assert!(handle.push_raw("b"));
        assert_eq!(queue.len().await.unwrap(), 2);

        drop(handle);
        assert_eq!(queue.pop().await.unwrap().as_deref(), Some("a"));
        assert_eq!(queue.pop().await.unwrap().as_deref(), Some("b"));
        assert_eq!(queue.pop().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_push_event() {
        let (mut queue, handle) = MemoryQueue::new("test");
        let event = RawEvent::new("add", "ds1").with_field("id", "1");
        assert!(handle.push(&event).unwrap());

        let payload = queue.pop().await.unwrap().unwrap();
        assert_eq!(RawEvent::from_json(&payload).unwrap(), event);
    }
}
