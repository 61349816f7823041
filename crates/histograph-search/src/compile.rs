//! Compilation of node acknowledgements into bulk actions.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use histograph_types::{Acknowledgement, FieldValue, Operation};

/// Bulk API verb.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BulkOp {
    /// Create or replace the document
    Index,
    /// Remove the document
    Delete,
}

impl BulkOp {
    /// Verb for a canonical operation.
    pub fn for_operation(operation: Operation) -> Self {
        match operation {
            Operation::Add => BulkOp::Index,
            Operation::Remove => BulkOp::Delete,
        }
    }

    /// Wire name, also the key of the matching item in a bulk response.
    pub fn as_str(&self) -> &'static str {
        match self {
            BulkOp::Index => "index",
            BulkOp::Delete => "delete",
        }
    }
}

/// Target of one bulk action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionDescriptor {
    #[serde(rename = "_index")]
    pub index: String,

    #[serde(rename = "_type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

/// One compiled unit: an action line plus, for `index`, a document line.
#[derive(Debug, Clone, PartialEq)]
pub struct BulkActionPair {
    pub op: BulkOp,
    pub action: ActionDescriptor,
    pub document: Option<Value>,
}

impl BulkActionPair {
    /// Index targeted by an `index` action; `None` for deletes.
    pub fn index_to_create(&self) -> Option<&str> {
        match self.op {
            BulkOp::Index => Some(&self.action.index),
            BulkOp::Delete => None,
        }
    }

    /// The action line, `{"index": {"_index": .., "_type": .., "_id": ..}}`.
    pub fn action_line(&self) -> Result<Value, serde_json::Error> {
        let mut line = Map::new();
        line.insert(self.op.as_str().to_string(), serde_json::to_value(&self.action)?);
        Ok(Value::Object(line))
    }

    /// Append this pair to an NDJSON bulk body.
    pub fn write_ndjson(&self, out: &mut String) -> Result<(), serde_json::Error> {
        out.push_str(&serde_json::to_string(&self.action_line()?)?);
        out.push('\n');
        if let Some(document) = &self.document {
            out.push_str(&serde_json::to_string(document)?);
            out.push('\n');
        }
        Ok(())
    }
}

/// Render a sequence of pairs as an NDJSON bulk body.
pub fn to_ndjson(actions: &[BulkActionPair]) -> Result<String, serde_json::Error> {
    let mut body = String::new();
    for pair in actions {
        pair.write_ndjson(&mut body)?;
    }
    Ok(body)
}

/// Compile a single acknowledgement.
pub fn compile_one(ack: &Acknowledgement) -> BulkActionPair {
    let command = &ack.command;
    let op = BulkOp::for_operation(command.operation);
    let action = ActionDescriptor {
        index: command.dataset.clone(),
        kind: command.kind.clone(),
        id: command.id.clone(),
    };

    let document = match op {
        BulkOp::Index => Some(document(&command.data)),
        BulkOp::Delete => None,
    };

    BulkActionPair {
        op,
        action,
        document,
    }
}

/// Compile a batch, preserving item order.
pub fn compile(batch: &[Acknowledgement]) -> Vec<BulkActionPair> {
    let actions: Vec<_> = batch.iter().map(compile_one).collect();
    debug!(items = batch.len(), "Compiled bulk actions");
    actions
}

fn document(data: &histograph_types::Payload) -> Value {
    let mut doc = Map::new();
    for (key, value) in data {
        let json = match (key.as_str(), value) {
            // geometry was stringified during normalization; restore it if it parses
            ("geometry", FieldValue::String(raw)) => {
                serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.clone()))
            }
            _ => value.to_json(),
        };
        doc.insert(key.clone(), json);
    }
    Value::Object(doc)
}
