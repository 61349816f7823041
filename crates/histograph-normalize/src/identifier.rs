//! Identifier canonicalization.
//!
//! Producers refer to nodes with local ids, `dataset/id` pairs, URNs or
//! full URIs. Everything that enters the graph store is canonicalized to
//! one form so that edges and nodes from different producers meet.

use crate::error::NormalizeError;

/// Canonicalizes a raw identifier within a dataset scope.
pub trait IdentifierNormalizer: Send + Sync {
    /// Normalize `raw`, interpreting relative ids inside `dataset`.
    fn normalize(&self, raw: &str, dataset: &str) -> Result<String, NormalizeError>;
}

const HGID_PREFIX: &str = "urn:hgid:";

/// Default normalizer producing `urn:hgid:` identifiers.
///
/// - `scheme://...` URIs and `urn:` identifiers are kept as they are
/// - `dataset/id` becomes `urn:hgid:dataset/id`
/// - a bare `id` becomes `urn:hgid:<dataset>/id`
#[derive(Debug, Clone, Copy, Default)]
pub struct HgidNormalizer;

impl HgidNormalizer {
    /// Create the default normalizer.
    pub fn new() -> Self {
        Self
    }
}

fn rejected(raw: &str, reason: &str) -> NormalizeError {
    NormalizeError::InvalidIdentifier {
        raw: raw.to_string(),
        reason: reason.to_string(),
    }
}

impl IdentifierNormalizer for HgidNormalizer {
    fn normalize(&self, raw: &str, dataset: &str) -> Result<String, NormalizeError> {
        let id = raw.trim();
        if id.is_empty() {
            return Err(rejected(raw, "empty identifier"));
        }
        if id.chars().any(char::is_whitespace) {
            return Err(rejected(raw, "contains whitespace"));
        }

        if id.contains("://") || id.starts_with("urn:") {
            return Ok(id.to_string());
        }

        if let Some((scope, local)) = id.split_once('/') {
            if scope.is_empty() || local.is_empty() {
                return Err(rejected(raw, "empty dataset or local part"));
            }
            return Ok(format!("{HGID_PREFIX}{id}"));
        }

        if dataset.is_empty() {
            return Err(rejected(raw, "relative identifier without a dataset"));
        }
        Ok(format!("{HGID_PREFIX}{dataset}/{id}"))
    }
}
