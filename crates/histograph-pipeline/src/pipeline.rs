//! The staged ingestion pipeline.
//!
//! Three tokio tasks joined by bounded channels:
//!
//! 1. ingest: pull, normalize, register with the graph store, keep nodes
//! 2. batch: group node acknowledgements by count or age
//! 3. index: compile, provision indices, write through the bulk sink
//!
//! The index stage stops pulling batches while the sink is suspended.
//! The full channels then hold back the batcher and, behind it, the queue
//! pull. Cancelling the token stops the ingest stage; the batcher flushes
//! its open batch and the index stage drains what is left.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use histograph_graph::GraphSink;
use histograph_normalize::CommandNormalizer;
use histograph_queue::{QueueSource, SourceError};
use histograph_search::{compile, BulkSink, IndexProvisioner, SinkError, WriteOutcome};
use histograph_types::{Acknowledgement, CoreSettings};

use crate::batcher::{run_batcher, Batcher};
use crate::error::PipelineError;
use crate::stats::{PipelineStats, StatsSnapshot};

/// Configuration for the pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Maximum node acknowledgements per batch
    pub batch_size: usize,
    /// Maximum age of a batch, counted from its first item
    pub batch_timeout: Duration,
    /// Capacity of the channel between ingest and batcher
    pub channel_capacity: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            batch_size: 500,
            batch_timeout: Duration::from_secs(5),
            channel_capacity: 1024,
        }
    }
}

impl From<&CoreSettings> for PipelineConfig {
    fn from(settings: &CoreSettings) -> Self {
        Self::default()
            .with_batch_size(settings.batch_size)
            .with_batch_timeout(settings.batch_timeout())
    }
}

impl PipelineConfig {
    /// Set the batch size.
    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size;
        self
    }

    /// Set the batch window.
    pub fn with_batch_timeout(mut self, timeout: Duration) -> Self {
        self.batch_timeout = timeout;
        self
    }

    /// Set the ingest channel capacity.
    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity.max(1);
        self
    }
}

/// Queue to graph store and search index, end to end.
pub struct Pipeline {
    source: QueueSource,
    normalizer: CommandNormalizer,
    graph: GraphSink,
    provisioner: IndexProvisioner,
    sink: BulkSink,
    config: PipelineConfig,
    cancel: CancellationToken,
    stats: Arc<PipelineStats>,
}

impl Pipeline {
    /// Assemble a pipeline from its components.
    pub fn new(
        source: QueueSource,
        normalizer: CommandNormalizer,
        graph: GraphSink,
        provisioner: IndexProvisioner,
        sink: BulkSink,
        config: PipelineConfig,
    ) -> Self {
        Self {
            source,
            normalizer,
            graph,
            provisioner,
            sink,
            config,
            cancel: CancellationToken::new(),
            stats: Arc::new(PipelineStats::new()),
        }
    }

    /// Token that stops the pipeline when cancelled.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Live counters.
    pub fn stats(&self) -> Arc<PipelineStats> {
        Arc::clone(&self.stats)
    }

    /// Run until the queue closes, the token is cancelled or the sink
    /// fails fatally.
    pub async fn run(self) -> Result<StatsSnapshot, PipelineError> {
        let Pipeline {
            source,
            normalizer,
            graph,
            provisioner,
            sink,
            config,
            cancel,
            stats,
        } = self;

        info!(
            queue = %source.queue_name(),
            batch_size = config.batch_size,
            batch_timeout_ms = config.batch_timeout.as_millis() as u64,
            "Pipeline starting"
        );

        let (ack_tx, ack_rx) = mpsc::channel(config.channel_capacity);
        // capacity 1: a suspended sink holds back the batcher immediately
        let (batch_tx, batch_rx) = mpsc::channel(1);

        let ingest = tokio::spawn(ingest(
            source,
            normalizer,
            graph,
            ack_tx,
            cancel.clone(),
            Arc::clone(&stats),
        ));
        let batcher = tokio::spawn(run_batcher(
            Batcher::new(config.batch_size, config.batch_timeout),
            ack_rx,
            batch_tx,
        ));
        let indexer = tokio::spawn(index(
            batch_rx,
            provisioner,
            sink,
            cancel.clone(),
            Arc::clone(&stats),
        ));

        let indexed = indexer.await;
        let batches = batcher.await;
        let ingested = ingest.await;

        let snapshot = stats.snapshot();
        match indexed? {
            Ok(()) => {
                batches?;
                ingested?;
                info!(
                    received = snapshot.received,
                    dropped = snapshot.dropped(),
                    batches = snapshot.batches_written,
                    documents = snapshot.documents_written,
                    "Pipeline stopped"
                );
                Ok(snapshot)
            }
            Err(e) => {
                error!(error = %e, "Pipeline aborted");
                Err(e.into())
            }
        }
    }
}

async fn ingest(
    mut source: QueueSource,
    normalizer: CommandNormalizer,
    graph: GraphSink,
    output: mpsc::Sender<Acknowledgement>,
    cancel: CancellationToken,
    stats: Arc<PipelineStats>,
) {
    loop {
        let next = tokio::select! {
            _ = cancel.cancelled() => {
                debug!("Ingest cancelled");
                break;
            }
            next = source.next() => next,
        };

        let event = match next {
            Some(Ok(event)) => event,
            Some(Err(e)) => {
                match &e {
                    SourceError::Transport(_) => stats.record_transport_error(),
                    SourceError::Parse { .. } => {
                        stats.record_received();
                        stats.record_parse_error();
                    }
                }
                error!(error = %e, "Dropping queue message");
                continue;
            }
            None => break,
        };
        stats.record_received();

        let command = match normalizer.normalize(&event) {
            Ok(command) => command,
            Err(e) => {
                stats.record_normalize_error();
                error!(
                    error = %e,
                    event = %event.to_json().unwrap_or_default(),
                    "Dropping event that failed normalization"
                );
                continue;
            }
        };

        let ack = match graph.register(&command).await {
            Ok(ack) => ack,
            Err(_) => {
                stats.record_graph_error();
                continue;
            }
        };

        // relations live in the graph store only
        if !ack.is_node() {
            stats.record_relation_skipped();
            continue;
        }

        if output.send(ack).await.is_err() {
            debug!("Batcher gone, ingest stopping");
            break;
        }
        stats.record_node_forwarded();
    }
}

async fn index(
    mut input: mpsc::Receiver<Vec<Acknowledgement>>,
    provisioner: IndexProvisioner,
    mut sink: BulkSink,
    cancel: CancellationToken,
    stats: Arc<PipelineStats>,
) -> Result<(), SinkError> {
    while let Some(batch) = input.recv().await {
        let mut pending = provisioner.ensure(compile(&batch)).await;
        let documents = pending.len();

        loop {
            let outcome = match sink.write(pending).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    cancel.cancel();
                    return Err(e);
                }
            };

            if let WriteOutcome::Delivered(summary) = &outcome {
                stats.record_batch_written(documents, summary.failed_items + summary.rejected_items);
                break;
            }
            let Some(retained) = outcome.into_pending() else {
                break;
            };

            if cancel.is_cancelled() {
                warn!(actions = retained.len(), "Dropping batch at shutdown, search engine unavailable");
                stats.record_batch_dropped();
                break;
            }
            pending = retained;

            tokio::select! {
                _ = sink.wait_ready() => {}
                _ = cancel.cancelled() => {}
            }
        }
    }
    Ok(())
}
