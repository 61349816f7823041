//! Lazy index creation ahead of bulk writes.

use std::collections::HashSet;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::compile::BulkActionPair;
use crate::engine::{CreateOutcome, SearchEngine};
use crate::mapping::default_mapping;
use crate::registry::IndexRegistry;

/// Default bound on concurrent creation calls per batch.
pub const DEFAULT_CREATE_CONCURRENCY: usize = 10;

/// What happened to the indices referenced by one batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProvisionReport {
    /// Newly created indices
    pub created: Vec<String>,
    /// Indices the engine reported as already existing
    pub existing: Vec<String>,
    /// Indices whose creation failed
    pub failed: Vec<String>,
}

impl ProvisionReport {
    /// Number of creation calls issued.
    pub fn attempts(&self) -> usize {
        self.created.len() + self.existing.len() + self.failed.len()
    }
}

/// Creates the indices a batch writes to, once per index.
#[derive(Clone)]
pub struct IndexProvisioner {
    engine: Arc<dyn SearchEngine>,
    registry: IndexRegistry,
    mapping: Arc<Value>,
    concurrency: usize,
}

impl IndexProvisioner {
    /// Create a provisioner using the built-in mapping.
    pub fn new(engine: Arc<dyn SearchEngine>, registry: IndexRegistry) -> Self {
        Self {
            engine,
            registry,
            mapping: Arc::new(default_mapping()),
            concurrency: DEFAULT_CREATE_CONCURRENCY,
        }
    }

    /// Replace the mapping used for new indices.
    pub fn with_mapping(mut self, mapping: Value) -> Self {
        self.mapping = Arc::new(mapping);
        self
    }

    /// Bound concurrent creation calls (at least 1).
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// The registry this provisioner fills.
    pub fn registry(&self) -> &IndexRegistry {
        &self.registry
    }

    /// Provision every index the batch needs, then hand the batch back.
    pub async fn ensure(&self, actions: Vec<BulkActionPair>) -> Vec<BulkActionPair> {
        self.provision(&actions).await;
        actions
    }

    /// Create the unknown indices referenced by `index` actions.
    ///
    /// Resolves once every creation attempt has finished. Failures are
    /// logged and reported but never block the batch.
    pub async fn provision(&self, actions: &[BulkActionPair]) -> ProvisionReport {
        let mut seen = HashSet::new();
        let referenced: Vec<&str> = actions
            .iter()
            .filter_map(BulkActionPair::index_to_create)
            .filter(|name| seen.insert(*name))
            .collect();

        let missing = self.registry.missing(referenced);
        let mut report = ProvisionReport::default();
        if missing.is_empty() {
            return report;
        }

        debug!(count = missing.len(), "Creating indices");
        let results: Vec<_> = stream::iter(missing)
            .map(|name| {
                let engine = Arc::clone(&self.engine);
                let mapping = Arc::clone(&self.mapping);
                async move {
                    let result = engine.create_index(&name, &mapping).await;
                    (name, result)
                }
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        for (name, result) in results {
            match result {
                Ok(CreateOutcome::Created) => {
                    self.registry.insert(name.clone());
                    report.created.push(name);
                }
                Ok(CreateOutcome::AlreadyExists) => {
                    warn!(index = %name, "Index already exists");
                    self.registry.insert(name.clone());
                    report.existing.push(name);
                }
                Err(e) => {
                    error!(index = %name, error = %e, "Failed creating index");
                    report.failed.push(name);
                }
            }
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile::compile;
    use crate::engine::BulkResponse;
    use crate::error::SearchError;
    use async_trait::async_trait;
    use histograph_types::{Acknowledgement, Command, Operation, Structure};
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct CreateOnly {
        calls: Mutex<Vec<String>>,
        existing: Vec<&'static str>,
        broken: Vec<&'static str>,
    }

    #[async_trait]
    impl SearchEngine for CreateOnly {
        async fn create_index(&self, name: &str, _mapping: &Value) -> Result<CreateOutcome, SearchError> {
            self.calls.lock().unwrap().push(name.to_string());
            if self.broken.iter().any(|b| *b == name) {
                Err(SearchError::from_status(400, "invalid_index_name_exception".into()))
            } else if self.existing.iter().any(|e| *e == name) {
                Ok(CreateOutcome::AlreadyExists)
            } else {
                Ok(CreateOutcome::Created)
            }
        }

        async fn bulk(&self, _: &[BulkActionPair], _: Duration) -> Result<BulkResponse, SearchError> {
            unreachable!("provisioner never writes")
        }

        async fn ping(&self) -> Result<(), SearchError> {
            Ok(())
        }
    }

    fn batch(items: &[(Operation, &str)]) -> Vec<BulkActionPair> {
        let acks: Vec<_> = items
            .iter()
            .map(|(op, dataset)| {
                Acknowledgement::new(Structure::Node, Command::node(*op, *dataset, "x"))
            })
            .collect();
        compile(&acks)
    }

    #[tokio::test]
    async fn test_creates_distinct_missing_indices() {
        let engine = Arc::new(CreateOnly::default());
        let provisioner = IndexProvisioner::new(engine.clone(), IndexRegistry::new());

        let report = provisioner
            .provision(&batch(&[
                (Operation::Add, "ds1"),
                (Operation::Add, "ds2"),
                (Operation::Add, "ds1"),
            ]))
            .await;

        let mut calls = engine.calls.lock().unwrap().clone();
        calls.sort();
        assert_eq!(calls, vec!["ds1", "ds2"]);
        assert_eq!(report.created.len(), 2);
        assert!(provisioner.registry().contains("ds1"));
    }

    #[tokio::test]
    async fn test_known_indices_issue_no_calls() {
        let engine = Arc::new(CreateOnly::default());
        let registry = IndexRegistry::new();
        registry.insert("ds1");
        let provisioner = IndexProvisioner::new(engine.clone(), registry);

        let report = provisioner.provision(&batch(&[(Operation::Add, "ds1")])).await;
        assert_eq!(report.attempts(), 0);
        assert!(engine.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_only_batch_provisions_nothing() {
        let engine = Arc::new(CreateOnly::default());
        let provisioner = IndexProvisioner::new(engine.clone(), IndexRegistry::new());

        provisioner.provision(&batch(&[(Operation::Remove, "ds1")])).await;
        assert!(engine.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_already_exists_is_registered() {
        let engine = Arc::new(CreateOnly {
            existing: vec!["ds1"],
            ..Default::default()
        });
        let provisioner = IndexProvisioner::new(engine, IndexRegistry::new());

        let report = provisioner.provision(&batch(&[(Operation::Add, "ds1")])).await;
        assert_eq!(report.existing, vec!["ds1"]);
        assert!(provisioner.registry().contains("ds1"));
    }

    #[tokio::test]
    async fn test_failure_does_not_block_batch() {
        let engine = Arc::new(CreateOnly {
            broken: vec!["ds2"],
            ..Default::default()
        });
        let provisioner = IndexProvisioner::new(engine, IndexRegistry::new()).with_concurrency(1);

        let actions = batch(&[(Operation::Add, "ds1"), (Operation::Add, "ds2")]);
        let released = provisioner.ensure(actions.clone()).await;

        assert_eq!(released, actions);
        assert!(provisioner.registry().contains("ds1"));
        assert!(!provisioner.registry().contains("ds2"));
    }
}
