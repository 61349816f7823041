//! Error types for the search side of the pipeline.

use thiserror::Error;

/// Errors from the search engine client.
#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Search engine over capacity ({status}): {body}")]
    Capacity { status: u16, body: String },

    #[error("Search engine returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid search engine response: {0}")]
    Decode(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl SearchError {
    /// Build the error for a non-success HTTP status.
    pub fn from_status(status: u16, body: String) -> Self {
        if status == 429 {
            SearchError::Capacity { status, body }
        } else {
            SearchError::Status { status, body }
        }
    }

    /// Timeouts and connection failures: the engine may recover on its own.
    pub fn is_transient(&self) -> bool {
        matches!(self, SearchError::Timeout(_) | SearchError::Transport(_))
    }

    /// The engine refused the work because it is saturated.
    pub fn is_capacity(&self) -> bool {
        matches!(self, SearchError::Capacity { .. })
    }
}

impl From<reqwest::Error> for SearchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            SearchError::Timeout(e.to_string())
        } else if e.is_decode() {
            SearchError::Decode(e.to_string())
        } else {
            SearchError::Transport(e.to_string())
        }
    }
}

/// Errors surfaced by the bulk sink to its caller.
#[derive(Error, Debug)]
pub enum SinkError {
    /// A structural failure; the sink accepts no further writes.
    #[error("Bulk write failed: {0}")]
    Fatal(#[source] SearchError),

    #[error("Bulk sink stopped after a fatal error")]
    Stopped,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert!(SearchError::from_status(429, String::new()).is_capacity());
        let bad_request = SearchError::from_status(400, "mapper_parsing_exception".into());
        assert!(!bad_request.is_capacity());
        assert!(!bad_request.is_transient());
        assert!(SearchError::Timeout("60s".into()).is_transient());
    }

    #[test]
    fn test_fatal_display() {
        let err = SinkError::Fatal(SearchError::Status {
            status: 400,
            body: "illegal_argument_exception".into(),
        });
        assert!(err.to_string().contains("illegal_argument_exception"));
    }
}
