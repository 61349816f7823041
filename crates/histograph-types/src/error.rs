//! Error types shared across the Histograph crates.

use thiserror::Error;

/// Unified error type for settings and data model operations.
#[derive(Debug, Error)]
pub enum HistographError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error (mapping files and similar)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid input error
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = HistographError::Config("batch_size must be > 0".to_string());
        assert_eq!(err.to_string(), "Configuration error: batch_size must be > 0");

        let err = HistographError::InvalidInput("empty dataset".to_string());
        assert_eq!(err.to_string(), "Invalid input: empty dataset");
    }

    #[test]
    fn test_from_serde_error() {
        let json_err = serde_json::from_str::<i32>("nope").unwrap_err();
        let err: HistographError = json_err.into();
        assert!(matches!(err, HistographError::Serialization(_)));
    }
}
