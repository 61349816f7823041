//! Redis list transport.

use async_trait::async_trait;
use redis::{aio::ConnectionManager, AsyncCommands, Client};
use tracing::{debug, info};

use crate::error::QueueError;
use crate::transport::QueueTransport;

/// Redis list consumed with `BLPOP`.
///
/// Producers `RPUSH` JSON events onto the list; this side blocks on the
/// head with no timeout. The connection manager reconnects after failures.
pub struct RedisQueue {
    conn: ConnectionManager,
    queue: String,
}

impl RedisQueue {
    /// Connect to Redis and bind to the named list.
    pub async fn connect(url: &str, queue: impl Into<String>) -> Result<Self, QueueError> {
        let client = Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        let queue = queue.into();

        info!(url = %url, queue = %queue, "Connected to Redis queue");

        Ok(Self { conn, queue })
    }

    /// Round-trip a `PING`.
    pub async fn ping(&mut self) -> Result<(), QueueError> {
        let _: String = redis::cmd("PING").query_async(&mut self.conn).await?;
        Ok(())
    }
}

#[async_trait]
impl QueueTransport for RedisQueue {
    async fn pop(&mut self) -> Result<Option<String>, QueueError> {
        loop {
            // timeout 0 blocks until a message arrives
            let popped: Option<(String, String)> = self.conn.blpop(&self.queue, 0.0).await?;
            match popped {
                Some((_, payload)) => return Ok(Some(payload)),
                None => debug!(queue = %self.queue, "BLPOP returned nil, waiting again"),
            }
        }
    }

    async fn len(&mut self) -> Result<u64, QueueError> {
        let len: u64 = self.conn.llen(&self.queue).await?;
        Ok(len)
    }

    fn name(&self) -> &str {
        &self.queue
    }
}
