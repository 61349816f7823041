//! Names of indices known to exist.

use std::collections::HashSet;
use std::sync::{Arc, RwLock};

/// Shared cache of index names that exist (or are assumed to) in the engine.
///
/// Cloning shares the underlying set. Losing an entry only costs a
/// redundant creation call, which the engine answers with "already exists".
#[derive(Debug, Clone, Default)]
pub struct IndexRegistry {
    known: Arc<RwLock<HashSet<String>>>,
}

impl IndexRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `name` is known.
    pub fn contains(&self, name: &str) -> bool {
        self.known
            .read()
            .map(|known| known.contains(name))
            .unwrap_or(false)
    }

    /// Record `name` as existing. Returns true if it was not known before.
    pub fn insert(&self, name: impl Into<String>) -> bool {
        match self.known.write() {
            Ok(mut known) => known.insert(name.into()),
            Err(poisoned) => poisoned.into_inner().insert(name.into()),
        }
    }

    /// The subset of `names` not yet known, in input order.
    pub fn missing<'a>(&self, names: impl IntoIterator<Item = &'a str>) -> Vec<String> {
        names
            .into_iter()
            .filter(|name| !self.contains(name))
            .map(str::to_string)
            .collect()
    }

    /// Number of known indices.
    pub fn len(&self) -> usize {
        self.known.read().map(|known| known.len()).unwrap_or(0)
    }

    /// Whether no index is known yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
