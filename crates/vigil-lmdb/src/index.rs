//! Named pattern indexes
//!
//! LMDB keeps keys sorted, so an index does not need its own B-tree: it is
//! a name bound to a glob pattern, and iterating it seeks to the pattern's
//! literal prefix and walks forward in key order.

use parking_lot::RwLock;
use std::collections::BTreeMap;
use vigil_core::{Result, VigilError};

#[derive(Debug, Default)]
pub struct IndexRegistry {
    indexes: RwLock<BTreeMap<String, String>>,
}

impl IndexRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `pattern` under `name`. Returns false (and keeps the existing
    /// pattern) if the name is already taken.
    pub fn create(&self, name: &str, pattern: &str) -> bool {
        let mut indexes = self.indexes.write();
        if indexes.contains_key(name) {
            return false;
        }
        indexes.insert(name.to_string(), pattern.to_string());
        true
    }

    pub fn drop_index(&self, name: &str) -> bool {
        self.indexes.write().remove(name).is_some()
    }

    pub fn pattern(&self, name: &str) -> Result<String> {
        self.indexes
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| VigilError::IndexNotFound(name.to_string()))
    }

    pub fn names(&self) -> Vec<String> {
        self.indexes.read().keys().cloned().collect()
    }
}
