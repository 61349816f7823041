//! Canonical graph mutations and their acknowledgements.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::value::Payload;

/// Canonical mutation kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    /// Create or replace
    Add,
    /// Delete
    Remove,
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operation::Add => write!(f, "add"),
            Operation::Remove => write!(f, "remove"),
        }
    }
}

/// Shape of a registered command in the graph store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Structure {
    /// A node, identified by `id`
    Node,
    /// An edge between `source` and `target`
    Relation,
}

impl Structure {
    /// Derive the structure from the identifiers a command carries.
    ///
    /// A command with an `id` is a node; one with both `source` and `target`
    /// is a relation. Anything else has no structure.
    pub fn of(command: &Command) -> Option<Self> {
        if command.id.is_some() {
            Some(Structure::Node)
        } else if command.source.is_some() && command.target.is_some() {
            Some(Structure::Relation)
        } else {
            None
        }
    }
}

impl std::fmt::Display for Structure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Structure::Node => write!(f, "node"),
            Structure::Relation => write!(f, "relation"),
        }
    }
}

/// A normalized graph mutation.
///
/// Either `id` (node) or `source` and `target` (edge) is meaningful.
/// Nested objects in `data` have already been serialized to strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    /// Canonical operation
    pub operation: Operation,

    /// Dataset the mutation belongs to; doubles as the search index name
    pub dataset: String,

    /// Entity or edge type
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    /// Normalized node identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Normalized edge source identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    /// Normalized edge target identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,

    /// Document body
    #[serde(default)]
    pub data: Payload,
}

impl Command {
    /// Create a node command.
    pub fn node(operation: Operation, dataset: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            operation,
            dataset: dataset.into(),
            kind: None,
            id: Some(id.into()),
            source: None,
            target: None,
            data: Payload::new(),
        }
    }

    /// Create an edge command.
    pub fn relation(
        operation: Operation,
        dataset: impl Into<String>,
        source: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        Self {
            operation,
            dataset: dataset.into(),
            kind: None,
            id: None,
            source: Some(source.into()),
            target: Some(target.into()),
            data: Payload::new(),
        }
    }

    /// Set the entity or edge type.
    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    /// Replace the document body.
    pub fn with_data(mut self, data: Payload) -> Self {
        self.data = data;
        self
    }

    /// Structure implied by the command's identifiers.
    pub fn structure(&self) -> Option<Structure> {
        Structure::of(self)
    }
}

/// Graph store confirmation of a registered command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Acknowledgement {
    /// Structure assigned by the store
    pub structure: Structure,

    /// The command as it was submitted
    pub command: Command,

    /// Store-assigned request identifier, when the store provides one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,

    /// When the store confirmed the command (milliseconds since epoch in JSON)
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub registered_at: DateTime<Utc>,
}

impl Acknowledgement {
    /// Acknowledge a command with the given structure.
    pub fn new(structure: Structure, command: Command) -> Self {
        Self {
            structure,
            command,
            request_id: None,
            registered_at: Utc::now(),
        }
    }

    /// Attach a store request identifier.
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    /// Whether the acknowledged command is a node.
    pub fn is_node(&self) -> bool {
        self.structure == Structure::Node
    }
}
