//! In-memory graph store.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use histograph_types::{Acknowledgement, Command, Structure};

use crate::error::GraphError;
use crate::store::GraphStore;

/// Records every registered command and assigns structure from its shape.
#[derive(Default)]
pub struct MemoryGraphStore {
    registered: Mutex<Vec<Command>>,
    failures: AtomicU32,
}

impl MemoryGraphStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `count` registrations with a transient error.
    pub fn fail_next(&self, count: u32) {
        self.failures.store(count, Ordering::SeqCst);
    }

    /// Commands registered so far, in order.
    pub fn registered(&self) -> Vec<Command> {
        self.registered
            .lock()
            .map(|commands| commands.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl GraphStore for MemoryGraphStore {
    async fn register(&self, command: &Command) -> Result<Acknowledgement, GraphError> {
        let failing = self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(GraphError::Status {
                status: 503,
                body: "unavailable".to_string(),
            });
        }

        let structure = Structure::of(command).ok_or_else(|| GraphError::NoStructure {
            dataset: command.dataset.clone(),
        })?;

        if let Ok(mut registered) = self.registered.lock() {
            registered.push(command.clone());
        }
        Ok(Acknowledgement::new(structure, command.clone()))
    }
}
