//! Error types for the pipeline.

use thiserror::Error;

use histograph_search::SinkError;

/// Errors that end a pipeline run.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Search sink failed: {0}")]
    Sink(#[from] SinkError),

    #[error("Pipeline task failed: {0}")]
    Task(String),
}

impl From<tokio::task::JoinError> for PipelineError {
    fn from(e: tokio::task::JoinError) -> Self {
        PipelineError::Task(e.to_string())
    }
}
