//! Pipeline counters.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Live counters shared by the pipeline stages.
#[derive(Debug, Default)]
pub struct PipelineStats {
    received: AtomicU64,
    transport_errors: AtomicU64,
    parse_errors: AtomicU64,
    normalize_errors: AtomicU64,
    graph_errors: AtomicU64,
    relations_skipped: AtomicU64,
    nodes_forwarded: AtomicU64,
    batches_written: AtomicU64,
    documents_written: AtomicU64,
    item_failures: AtomicU64,
    batches_dropped: AtomicU64,
}

/// Point-in-time copy of [`PipelineStats`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    /// Messages popped from the queue, parsable or not
    pub received: u64,
    /// Failed queue pulls
    pub transport_errors: u64,
    /// Unparsable queue payloads
    pub parse_errors: u64,
    /// Events rejected by the normalizer
    pub normalize_errors: u64,
    /// Commands the graph store did not accept
    pub graph_errors: u64,
    /// Relation acknowledgements kept out of the search index
    pub relations_skipped: u64,
    /// Node acknowledgements handed to the batcher
    pub nodes_forwarded: u64,
    /// Batches accepted by the search engine
    pub batches_written: u64,
    /// Bulk actions in those batches
    pub documents_written: u64,
    /// Bulk items that failed inside delivered batches
    pub item_failures: u64,
    /// Batches given up on at shutdown
    pub batches_dropped: u64,
}

impl StatsSnapshot {
    /// Messages dropped before reaching the graph store or the batcher.
    pub fn dropped(&self) -> u64 {
        self.parse_errors + self.normalize_errors + self.graph_errors
    }
}

fn bump(counter: &AtomicU64, by: u64) {
    counter.fetch_add(by, Ordering::Relaxed);
}

impl PipelineStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_received(&self) {
        bump(&self.received, 1);
    }

    pub(crate) fn record_transport_error(&self) {
        bump(&self.transport_errors, 1);
    }

    pub(crate) fn record_parse_error(&self) {
        bump(&self.parse_errors, 1);
    }

    pub(crate) fn record_normalize_error(&self) {
        bump(&self.normalize_errors, 1);
    }

    pub(crate) fn record_graph_error(&self) {
        bump(&self.graph_errors, 1);
    }

    pub(crate) fn record_relation_skipped(&self) {
        bump(&self.relations_skipped, 1);
    }

    pub(crate) fn record_node_forwarded(&self) {
        bump(&self.nodes_forwarded, 1);
    }

    pub(crate) fn record_batch_written(&self, documents: usize, item_failures: usize) {
        bump(&self.batches_written, 1);
        bump(&self.documents_written, documents as u64);
        bump(&self.item_failures, item_failures as u64);
    }

    pub(crate) fn record_batch_dropped(&self) {
        bump(&self.batches_dropped, 1);
    }

    /// Copy the current values.
    pub fn snapshot(&self) -> StatsSnapshot {
        let get = |c: &AtomicU64| c.load(Ordering::Relaxed);
        StatsSnapshot {
            received: get(&self.received),
            transport_errors: get(&self.transport_errors),
            parse_errors: get(&self.parse_errors),
            normalize_errors: get(&self.normalize_errors),
            graph_errors: get(&self.graph_errors),
            relations_skipped: get(&self.relations_skipped),
            nodes_forwarded: get(&self.nodes_forwarded),
            batches_written: get(&self.batches_written),
            documents_written: get(&self.documents_written),
            item_failures: get(&self.item_failures),
            batches_dropped: get(&self.batches_dropped),
        }
    }
}
