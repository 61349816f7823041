//! Ordered registration with retry.

use std::sync::Arc;
use std::time::Duration;

use backoff::{backoff::Backoff, ExponentialBackoff, ExponentialBackoffBuilder};
use futures::{Stream, StreamExt};
use tracing::{debug, error, warn};

use histograph_types::{Acknowledgement, Command};

use crate::error::GraphError;
use crate::store::GraphStore;

/// Registers commands one at a time, preserving submission order.
///
/// Transient failures are retried with exponential backoff up to
/// `max_retries` times. A command that still fails is logged together with
/// its payload and dropped; the queue message it came from is already gone.
pub struct GraphSink {
    store: Arc<dyn GraphStore>,
    max_retries: u32,
    initial_interval: Duration,
}

impl GraphSink {
    /// Wrap a store.
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        Self {
            store,
            max_retries: 3,
            initial_interval: Duration::from_millis(200),
        }
    }

    /// Set the retry budget for transient failures.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the first retry delay.
    pub fn with_initial_interval(mut self, interval: Duration) -> Self {
        self.initial_interval = interval;
        self
    }

    fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoffBuilder::new()
            .with_initial_interval(self.initial_interval)
            .with_max_interval(Duration::from_secs(10))
            .with_max_elapsed_time(None)
            .build()
    }

    /// Register one command, retrying transient failures.
    pub async fn register(&self, command: &Command) -> Result<Acknowledgement, GraphError> {
        let mut backoff = self.backoff();
        let mut attempts = 0;

        loop {
            attempts += 1;
            debug!(attempt = attempts, dataset = %command.dataset, "Registering command");

            match self.store.register(command).await {
                Ok(ack) => return Ok(ack),
                Err(e) if e.is_transient() && attempts <= self.max_retries => {
                    let delay = backoff.next_backoff().unwrap_or(self.initial_interval);
                    warn!(
                        error = %e,
                        attempt = attempts,
                        retry_in_ms = delay.as_millis() as u64,
                        "Graph registration failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    error!(
                        error = %e,
                        attempts,
                        command = %serde_json::to_string(command).unwrap_or_default(),
                        "Dropping command after graph registration failure"
                    );
                    return Err(e);
                }
            }
        }
    }

    /// Register a stream of commands, yielding one acknowledgement per
    /// successfully registered command in submission order.
    pub fn register_all<S>(self: Arc<Self>, commands: S) -> impl Stream<Item = Acknowledgement>
    where
        S: Stream<Item = Command>,
    {
        commands
            .then(move |command| {
                let sink = Arc::clone(&self);
                async move { sink.register(&command).await.ok() }
            })
            .filter_map(futures::future::ready)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryGraphStore;
    use histograph_types::{Operation, Structure};

    fn sink(store: Arc<MemoryGraphStore>, retries: u32) -> GraphSink {
        GraphSink::new(store)
            .with_max_retries(retries)
            .with_initial_interval(Duration::from_millis(10))
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failures_are_retried() {
        let store = Arc::new(MemoryGraphStore::new());
        store.fail_next(2);

        let ack = sink(store.clone(), 3)
            .register(&Command::node(Operation::Add, "ds1", "a"))
            .await
            .unwrap();
        assert_eq!(ack.structure, Structure::Node);
        assert_eq!(store.registered().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_budget_is_bounded() {
        let store = Arc::new(MemoryGraphStore::new());
        store.fail_next(5);

        let result = sink(store.clone(), 2)
            .register(&Command::node(Operation::Add, "ds1", "a"))
            .await;
        assert!(result.is_err());
        assert!(store.registered().is_empty());
    }

    #[tokio::test]
    async fn test_permanent_failure_is_not_retried() {
        let store = Arc::new(MemoryGraphStore::new());
        let mut half = Command::relation(Operation::Add, "ds1", "a", "b");
        half.target = None;

        let err = sink(store, 3).register(&half).await.unwrap_err();
        assert!(matches!(err, GraphError::NoStructure { .. }));
    }

    #[tokio::test]
    async fn test_stream_preserves_order_and_skips_failures() {
        let store = Arc::new(MemoryGraphStore::new());
        let mut broken = Command::node(Operation::Add, "ds1", "b");
        broken.id = None;

        let commands = futures::stream::iter(vec![
            Command::node(Operation::Add, "ds1", "a"),
            broken,
            Command::relation(Operation::Add, "ds1", "a", "c"),
            Command::node(Operation::Remove, "ds1", "d"),
        ]);
        let acks: Vec<_> = Arc::new(sink(store, 0))
            .register_all(commands)
            .collect()
            .await;

        let structures: Vec<_> = acks.iter().map(|a| a.structure).collect();
        assert_eq!(
            structures,
            vec![Structure::Node, Structure::Relation, Structure::Node]
        );
        assert_eq!(acks[2].command.operation, Operation::Remove);
    }
}
