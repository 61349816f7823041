//! Raw change events as popped from the queue.
//!
//! A raw event is the producer's view of a mutation: a loosely typed
//! action verb, the dataset it is scoped to, and a bag of fields. The
//! normalizer turns it into a [`Command`](crate::Command).

use serde::{Deserialize, Serialize};

use crate::command::Operation;
use crate::value::{FieldValue, Payload};

/// Action verbs accepted from producers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Create a node or edge
    Add,
    /// Replace a node or edge
    Update,
    /// Delete a node or edge
    Delete,
}

impl Action {
    /// Parse a producer verb. Unknown verbs yield `None`.
    pub fn parse(verb: &str) -> Option<Self> {
        match verb {
            "add" => Some(Action::Add),
            "update" => Some(Action::Update),
            "delete" => Some(Action::Delete),
            _ => None,
        }
    }

    /// Canonical operation for this verb.
    ///
    /// Updates are upserts, so they collapse onto [`Operation::Add`].
    pub fn operation(self) -> Operation {
        match self {
            Action::Add | Action::Update => Operation::Add,
            Action::Delete => Operation::Remove,
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Action::Add => write!(f, "add"),
            Action::Update => write!(f, "update"),
            Action::Delete => write!(f, "delete"),
        }
    }
}

/// A raw event popped from the queue.
///
/// `action` is kept as the producer sent it so that an unknown verb can be
/// reported with its original spelling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawEvent {
    /// Producer verb (`add`, `update` or `delete`)
    pub action: String,

    /// Dataset (tenant / collection) the event is scoped to
    pub dataset: String,

    /// Arbitrary event fields
    #[serde(default)]
    pub data: Payload,

    /// Node identifier, when not carried inside `data`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<FieldValue>,

    /// Node URI, used when no `id` is present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<FieldValue>,

    /// Edge source identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<FieldValue>,

    /// Edge target identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<FieldValue>,
}

impl RawEvent {
    /// Create an event with an empty payload.
    pub fn new(action: impl Into<String>, dataset: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            dataset: dataset.into(),
            data: Payload::new(),
            id: None,
            uri: None,
            from: None,
            to: None,
        }
    }

    /// Add a payload field.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    /// Deserialize from a JSON queue payload.
    pub fn from_json(payload: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(payload)
    }

    /// Serialize to a JSON queue payload.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
