//! End-to-end test infrastructure for histograph-core.
//!
//! Provides a shared TestHarness that assembles the full pipeline over
//! in-memory collaborators: a channel-backed queue, an in-memory graph
//! store and a scripted search engine.

use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::time::Instant;

use histograph_graph::{GraphSink, MemoryGraphStore};
use histograph_normalize::CommandNormalizer;
use histograph_pipeline::{Pipeline, PipelineConfig};
use histograph_queue::{MemoryQueue, MemoryQueueHandle, QueueSource};
use histograph_search::{
    BulkActionPair, BulkItem, BulkResponse, BulkSink, CreateOutcome, IndexProvisioner,
    IndexRegistry, ItemError, ItemResult, SearchEngine, SearchError,
};
use histograph_types::RawEvent;

/// Search engine double.
///
/// Records index creations and bulk requests. Bulk calls are answered from
/// a script first, then with a clean success for every action.
#[derive(Default)]
pub struct FakeSearchEngine {
    existing: Mutex<HashSet<String>>,
    creations: Mutex<Vec<String>>,
    requests: Mutex<Vec<Vec<BulkActionPair>>>,
    sent_at: Mutex<Vec<Instant>>,
    replies: Mutex<VecDeque<Result<BulkResponse, SearchError>>>,
}

impl FakeSearchEngine {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Pretend `index` was created by someone else.
    pub fn with_existing_index(self: Arc<Self>, index: &str) -> Arc<Self> {
        self.existing.lock().unwrap().insert(index.to_string());
        self
    }

    /// Queue a scripted reply for the next bulk call.
    pub fn reply_with(&self, reply: Result<BulkResponse, SearchError>) {
        self.replies.lock().unwrap().push_back(reply);
    }

    /// Index creation calls, in call order.
    pub fn creations(&self) -> Vec<String> {
        self.creations.lock().unwrap().clone()
    }

    /// Bulk requests, in call order.
    pub fn requests(&self) -> Vec<Vec<BulkActionPair>> {
        self.requests.lock().unwrap().clone()
    }

    /// When each bulk request arrived, on the tokio clock.
    pub fn sent_at(&self) -> Vec<Instant> {
        self.sent_at.lock().unwrap().clone()
    }

    /// Document ids of every bulk request.
    pub fn request_ids(&self) -> Vec<Vec<String>> {
        self.requests()
            .iter()
            .map(|r| r.iter().filter_map(|a| a.action.id.clone()).collect())
            .collect()
    }
}

#[async_trait]
impl SearchEngine for FakeSearchEngine {
    async fn create_index(&self, name: &str, _mapping: &Value) -> Result<CreateOutcome, SearchError> {
        self.creations.lock().unwrap().push(name.to_string());
        if self.existing.lock().unwrap().insert(name.to_string()) {
            Ok(CreateOutcome::Created)
        } else {
            Ok(CreateOutcome::AlreadyExists)
        }
    }

    async fn bulk(
        &self,
        actions: &[BulkActionPair],
        _timeout: Duration,
    ) -> Result<BulkResponse, SearchError> {
        self.requests.lock().unwrap().push(actions.to_vec());
        self.sent_at.lock().unwrap().push(Instant::now());
        if let Some(reply) = self.replies.lock().unwrap().pop_front() {
            return reply;
        }
        Ok(success(actions))
    }

    async fn ping(&self) -> Result<(), SearchError> {
        Ok(())
    }
}

/// A clean bulk response for `actions`.
pub fn success(actions: &[BulkActionPair]) -> BulkResponse {
    BulkResponse {
        took: 2,
        errors: false,
        items: actions
            .iter()
            .map(|a| {
                BulkItem::new(
                    a.op.as_str(),
                    ItemResult {
                        index: Some(a.action.index.clone()),
                        id: a.action.id.clone(),
                        status: 200,
                        error: None,
                    },
                )
            })
            .collect(),
    }
}

/// A bulk response whose only item was refused for lack of capacity.
pub fn rejected() -> BulkResponse {
    BulkResponse {
        took: 1,
        errors: true,
        items: vec![BulkItem::new(
            "index",
            ItemResult {
                status: 429,
                error: Some(ItemError {
                    kind: "es_rejected_execution_exception".to_string(),
                    reason: Some("rejected execution".to_string()),
                }),
                ..Default::default()
            },
        )],
    }
}

/// Shared test harness for E2E tests.
pub struct TestHarness {
    /// Producer side of the queue
    pub queue: MemoryQueueHandle,
    /// Graph store receiving every command
    pub graph: Arc<MemoryGraphStore>,
    /// Search engine double
    pub engine: Arc<FakeSearchEngine>,
    /// Registry shared with the provisioner
    pub registry: IndexRegistry,
    /// Pipeline under test
    pub pipeline: Pipeline,
}

/// Batching and cooldown used by the harness.
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    pub batch_size: usize,
    pub batch_timeout: Duration,
    pub cooldown: Duration,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            batch_size: 10,
            batch_timeout: Duration::from_secs(5),
            cooldown: Duration::from_secs(10),
        }
    }
}

impl TestHarness {
    /// Harness with default batching and a fresh engine.
    pub fn new() -> Self {
        Self::with_engine(FakeSearchEngine::new(), HarnessConfig::default())
    }

    /// Harness over a prepared engine.
    pub fn with_engine(engine: Arc<FakeSearchEngine>, config: HarnessConfig) -> Self {
        let (queue, handle) = MemoryQueue::new("e2e");
        let graph = Arc::new(MemoryGraphStore::new());
        let registry = IndexRegistry::new();

        let pipeline = Pipeline::new(
            QueueSource::new(Box::new(queue)),
            CommandNormalizer::default(),
            GraphSink::new(graph.clone()).with_initial_interval(Duration::from_millis(10)),
            IndexProvisioner::new(engine.clone(), registry.clone()),
            BulkSink::new(engine.clone()).with_cooldown(config.cooldown),
            PipelineConfig::default()
                .with_batch_size(config.batch_size)
                .with_batch_timeout(config.batch_timeout),
        );

        Self {
            queue: handle,
            graph,
            engine,
            registry,
            pipeline,
        }
    }

    /// Push events onto the queue.
    pub fn push_all(&self, events: &[RawEvent]) {
        for event in events {
            self.queue.push(event).expect("Failed to serialize event");
        }
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// A node event with a string id.
pub fn node_event(action: &str, dataset: &str, id: &str) -> RawEvent {
    RawEvent::new(action, dataset)
        .with_field("id", id)
        .with_field("type", "hg:Place")
}

/// A relation event between two ids.
pub fn relation_event(dataset: &str, from: &str, to: &str) -> RawEvent {
    RawEvent::new("add", dataset)
        .with_field("from", from)
        .with_field("to", to)
        .with_field("type", "hg:sameHgConcept")
}
