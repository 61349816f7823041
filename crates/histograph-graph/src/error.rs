//! Error types for graph store registration.

use thiserror::Error;

/// Errors from registering a command with the graph store.
#[derive(Error, Debug)]
pub enum GraphError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Graph store returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid graph store response: {0}")]
    Decode(String),

    #[error("Command in dataset {dataset} has neither an id nor a source/target pair")]
    NoStructure { dataset: String },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl GraphError {
    /// Whether retrying the same command may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            GraphError::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            GraphError::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_statuses() {
        let status = |status| GraphError::Status {
            status,
            body: String::new(),
        };
        assert!(status(503).is_transient());
        assert!(status(429).is_transient());
        assert!(!status(400).is_transient());
        assert!(!GraphError::NoStructure {
            dataset: "ds1".into()
        }
        .is_transient());
    }
}
