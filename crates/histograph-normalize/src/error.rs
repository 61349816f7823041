//! Error types for command normalization.

use thiserror::Error;

/// Reasons a raw event cannot become a command.
#[derive(Debug, Error)]
pub enum NormalizeError {
    /// The producer sent a verb outside add/update/delete
    #[error("Unknown action: {0}")]
    UnknownAction(String),

    /// The identifier normalizer rejected an identifier
    #[error("Invalid identifier '{raw}': {reason}")]
    InvalidIdentifier {
        /// Identifier as received
        raw: String,
        /// Why it was rejected
        reason: String,
    },

    /// Neither a node id nor a complete source/target pair was present
    #[error("Event in dataset '{dataset}' has neither an id nor a source/target pair")]
    MissingIdentifier {
        /// Dataset of the offending event
        dataset: String,
    },

    /// A fuzzy date field could not be converted
    #[error("Invalid fuzzy date in '{field}': {reason}")]
    FuzzyDate {
        /// Payload field name
        field: String,
        /// Why the conversion failed
        reason: String,
    },

    /// Nested value serialization failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
