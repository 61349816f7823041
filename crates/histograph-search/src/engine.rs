//! Search engine abstraction and bulk response model.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::compile::BulkActionPair;
use crate::error::SearchError;

/// Item error type signalling a full write queue on the engine side.
pub const REJECTED_EXECUTION: &str = "es_rejected_execution_exception";

/// Result of an index creation call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    Created,
    AlreadyExists,
}

/// Error detail attached to a failed bulk item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemError {
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Per-action result inside a bulk response.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ItemResult {
    #[serde(rename = "_index", default, skip_serializing_if = "Option::is_none")]
    pub index: Option<String>,

    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default)]
    pub status: u16,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ItemError>,
}

/// One item of a bulk response, keyed by the action verb
/// (`{"index": {...}}`, `{"delete": {...}}`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BulkItem(pub BTreeMap<String, ItemResult>);

impl BulkItem {
    /// Build an item for the given verb.
    pub fn new(op: impl Into<String>, result: ItemResult) -> Self {
        let mut item = BTreeMap::new();
        item.insert(op.into(), result);
        Self(item)
    }

    /// The action verb and its result.
    pub fn entry(&self) -> Option<(&str, &ItemResult)> {
        self.0.iter().next().map(|(op, result)| (op.as_str(), result))
    }

    /// Error attached to this item, whatever the verb.
    pub fn error(&self) -> Option<&ItemError> {
        self.entry().and_then(|(_, result)| result.error.as_ref())
    }

    /// Whether the engine refused this item for lack of capacity.
    pub fn is_rejected(&self) -> bool {
        self.error().is_some_and(|e| e.kind == REJECTED_EXECUTION)
    }
}

/// Envelope returned by a bulk call.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BulkResponse {
    #[serde(default)]
    pub took: u64,

    #[serde(default)]
    pub errors: bool,

    #[serde(default)]
    pub items: Vec<BulkItem>,
}

/// Client side of the search engine protocol.
#[async_trait]
pub trait SearchEngine: Send + Sync {
    /// Create `name` with the given settings and mappings.
    async fn create_index(&self, name: &str, mapping: &Value) -> Result<CreateOutcome, SearchError>;

    /// Submit one bulk request.
    async fn bulk(
        &self,
        actions: &[BulkActionPair],
        timeout: Duration,
    ) -> Result<BulkResponse, SearchError>;

    /// Verify the engine is reachable.
    async fn ping(&self) -> Result<(), SearchError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_bulk_response() {
        let response: BulkResponse = serde_json::from_value(json!({
            "took": 12,
            "errors": true,
            "items": [
                {"index": {"_index": "ds1", "_id": "a", "status": 201}},
                {"index": {"_index": "ds1", "_id": "b", "status": 429,
                    "error": {"type": "es_rejected_execution_exception", "reason": "queue full"}}},
                {"delete": {"_index": "ds1", "_id": "c", "status": 404}}
            ]
        }))
        .unwrap();

        assert_eq!(response.took, 12);
        assert!(response.errors);
        assert!(!response.items[0].is_rejected());
        assert!(response.items[1].is_rejected());
        assert_eq!(response.items[2].entry().unwrap().0, "delete");
    }

    #[test]
    fn test_missing_items_default_to_empty() {
        let response: BulkResponse = serde_json::from_value(json!({"took": 1, "errors": false})).unwrap();
        assert!(response.items.is_empty());
    }

    #[test]
    fn test_minimal_rejected_item() {
        let item: BulkItem = serde_json::from_value(json!({
            "index": {"error": {"type": "es_rejected_execution_exception"}}
        }))
        .unwrap();
        assert!(item.is_rejected());
        assert_eq!(item.entry().unwrap().1.status, 0);
    }
}
