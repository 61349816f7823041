//! Lazy sequence of raw events over a queue transport.

use std::time::Duration;

use backoff::{backoff::Backoff, ExponentialBackoff, ExponentialBackoffBuilder};
use futures::Stream;
use tracing::{debug, info, warn};

use histograph_types::RawEvent;

use crate::error::SourceError;
use crate::transport::QueueTransport;

/// Default number of messages between progress reports.
pub const DEFAULT_PROGRESS_EVERY: u64 = 100;

/// Pulls raw events from a transport, one blocking pop at a time.
///
/// Transport and parse errors are yielded inline and the sequence carries
/// on. After a transport error the next pull waits for an exponentially
/// growing delay, reset by the next successful pop.
pub struct QueueSource {
    transport: Box<dyn QueueTransport>,
    progress_every: u64,
    received: u64,
    parsed: u64,
    backoff: ExponentialBackoff,
    retry_after: Option<Duration>,
}

fn transport_backoff() -> ExponentialBackoff {
    ExponentialBackoffBuilder::new()
        .with_initial_interval(Duration::from_millis(500))
        .with_max_interval(Duration::from_secs(30))
        // never give up; the source only ends on shutdown
        .with_max_elapsed_time(None)
        .build()
}

impl QueueSource {
    /// Wrap a transport.
    pub fn new(transport: Box<dyn QueueTransport>) -> Self {
        Self {
            transport,
            progress_every: DEFAULT_PROGRESS_EVERY,
            received: 0,
            parsed: 0,
            backoff: transport_backoff(),
            retry_after: None,
        }
    }

    /// Report progress every `every` messages (0 disables it).
    pub fn with_progress_every(mut self, every: u64) -> Self {
        self.progress_every = every;
        self
    }

    /// Replace the retry policy used after transport errors.
    pub fn with_backoff(mut self, backoff: ExponentialBackoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Messages popped so far, including unparsable ones.
    pub fn received(&self) -> u64 {
        self.received
    }

    /// Messages that parsed into events.
    pub fn parsed(&self) -> u64 {
        self.parsed
    }

    /// Name of the underlying queue.
    pub fn queue_name(&self) -> &str {
        self.transport.name()
    }

    /// Pull the next item.
    ///
    /// Returns `None` only when the transport is closed.
    pub async fn next(&mut self) -> Option<Result<RawEvent, SourceError>> {
        if let Some(delay) = self.retry_after.take() {
            debug!(delay_ms = delay.as_millis() as u64, "Waiting before next queue pull");
            tokio::time::sleep(delay).await;
        }

        let payload = match self.transport.pop().await {
            Ok(Some(payload)) => payload,
            Ok(None) => {
                info!(
                    queue = %self.transport.name(),
                    received = self.received,
                    "Queue closed"
                );
                return None;
            }
            Err(e) => {
                let delay = self
                    .backoff
                    .next_backoff()
                    .unwrap_or(self.backoff.max_interval);
                warn!(
                    queue = %self.transport.name(),
                    error = %e,
                    retry_in_ms = delay.as_millis() as u64,
                    "Queue pull failed"
                );
                self.retry_after = Some(delay);
                return Some(Err(e.into()));
            }
        };

        self.backoff.reset();
        self.received += 1;

        let event = match RawEvent::from_json(&payload) {
            Ok(event) => event,
            Err(source) => return Some(Err(SourceError::Parse { payload, source })),
        };

        self.parsed += 1;
        if self.progress_every > 0 && self.parsed % self.progress_every == 0 {
            self.report_progress().await;
        }
        Some(Ok(event))
    }

    async fn report_progress(&mut self) {
        match self.transport.len().await {
            Ok(remaining) => info!(
                queue = %self.transport.name(),
                parsed = self.parsed,
                remaining,
                "Queue progress"
            ),
            Err(e) => debug!(error = %e, "Could not read queue length"),
        }
    }

    /// Turn the source into a stream.
    pub fn into_stream(self) -> impl Stream<Item = Result<RawEvent, SourceError>> + Send {
        futures::stream::unfold(self, |mut source| async move {
            source.next().await.map(|item| (item, source))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::QueueError;
    use crate::memory::MemoryQueue;
    use async_trait::async_trait;
    use futures::StreamExt;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    /// Scripted transport: each step is either a payload or a failure.
    struct Scripted {
        steps: VecDeque<Result<String, String>>,
        len_calls: Arc<AtomicU32>,
    }

    #[async_trait]
    impl QueueTransport for Scripted {
        async fn pop(&mut self) -> Result<Option<String>, QueueError> {
            match self.steps.pop_front() {
                Some(Ok(payload)) => Ok(Some(payload)),
                Some(Err(e)) => Err(QueueError::Transport(e)),
                None => Ok(None),
            }
        }

        async fn len(&mut self) -> Result<u64, QueueError> {
            self.len_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.steps.len() as u64)
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    fn scripted(steps: Vec<Result<&str, &str>>) -> (Scripted, Arc<AtomicU32>) {
        let len_calls = Arc::new(AtomicU32::new(0));
        let transport = Scripted {
            steps: steps
                .into_iter()
                .map(|s| s.map(str::to_string).map_err(str::to_string))
                .collect(),
            len_calls: len_calls.clone(),
        };
        (transport, len_calls)
    }

    const EVENT: &str = r#"{"action":"add","dataset":"ds1","data":{"id":"1"}}"#;

    #[tokio::test]
    async fn test_yields_events_in_order() {
        let (queue, handle) = MemoryQueue::new("test");
        handle.push(&RawEvent::new("add", "ds1").with_field("id", "1")).unwrap();
        handle.push(&RawEvent::new("delete", "ds1").with_field("id", "2")).unwrap();
        drop(handle);

        let events: Vec<_> = QueueSource::new(Box::new(queue)).into_stream().collect().await;
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].as_ref().unwrap().action, "add");
        assert_eq!(events[1].as_ref().unwrap().action, "delete");
    }

    #[tokio::test]
    async fn test_parse_error_does_not_end_sequence() {
        let (transport, _) = scripted(vec![Ok("not json"), Ok(EVENT)]);
        let mut source = QueueSource::new(Box::new(transport));

        match source.next().await {
            Some(Err(SourceError::Parse { payload, .. })) => assert_eq!(payload, "not json"),
            other => panic!("expected parse error, got {other:?}"),
        }
        assert!(source.next().await.unwrap().is_ok());
        assert!(source.next().await.is_none());
        assert_eq!(source.received(), 2);
        assert_eq!(source.parsed(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_error_backs_off_and_continues() {
        let (transport, _) = scripted(vec![Err("connection refused"), Ok(EVENT)]);
        let mut source = QueueSource::new(Box::new(transport)).with_backoff(
            ExponentialBackoffBuilder::new()
                .with_initial_interval(Duration::from_secs(1))
                .with_randomization_factor(0.0)
                .with_max_elapsed_time(None)
                .build(),
        );

        let first = source.next().await.unwrap();
        assert!(first.unwrap_err().is_transport());

        let before = tokio::time::Instant::now();
        assert!(source.next().await.unwrap().is_ok());
        assert!(before.elapsed() >= Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_progress_reads_queue_length() {
        let (transport, len_calls) = scripted(vec![Ok(EVENT), Ok(EVENT), Ok(EVENT), Ok(EVENT)]);
        let mut source = QueueSource::new(Box::new(transport)).with_progress_every(2);
        while source.next().await.is_some() {}

        assert_eq!(len_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_progress_counts_only_parsed_messages() {
        let (transport, len_calls) = scripted(vec![Ok(EVENT), Ok("{broken"), Ok("not json"), Ok(EVENT)]);
        let mut source = QueueSource::new(Box::new(transport)).with_progress_every(2);

        assert!(source.next().await.unwrap().is_ok());
        assert!(source.next().await.unwrap().is_err());
        assert!(source.next().await.unwrap().is_err());
        // two pops since the last event, but only one parsed
        assert_eq!(len_calls.load(Ordering::SeqCst), 0);

        assert!(source.next().await.unwrap().is_ok());
        assert_eq!(len_calls.load(Ordering::SeqCst), 1);
        assert_eq!(source.received(), 4);
        assert_eq!(source.parsed(), 2);
    }
}
