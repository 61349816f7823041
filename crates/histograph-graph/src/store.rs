//! Graph store abstraction.

use async_trait::async_trait;

use histograph_types::{Acknowledgement, Command};

use crate::error::GraphError;

/// A graph store that accepts canonical commands.
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Register one command and return the store's acknowledgement.
    ///
    /// The acknowledgement carries the submitted command back together
    /// with the structure the store assigned to it.
    async fn register(&self, command: &Command) -> Result<Acknowledgement, GraphError>;

    /// Verify the store is reachable.
    async fn check(&self) -> Result<(), GraphError> {
        Ok(())
    }
}
