//! MemoryStore implementation
//!
//! HashMap-based store with RwLock for concurrency.

use std::collections::{BTreeMap, HashMap};

use parking_lot::RwLock;

use crate::error::{Result, TlogError};
use super::KeyValueStore;

/// In-memory key-value map
///
/// ## Concurrency:
/// - `get`: shared read lock, many concurrent readers
/// - `put`/`delete`: exclusive write lock
/// - A reader never sees a half-applied write
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live keys
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// Check if the store holds no keys
    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }

    /// Sorted copy of the current contents
    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.data
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

impl KeyValueStore for MemoryStore {
    fn put(&self, key: &str, value: &str) -> Result<()> {
        self.data.write().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn get(&self, key: &str) -> Result<String> {
        self.data
            .read()
            .get(key)
            .cloned()
            .ok_or(TlogError::KeyNotFound)
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.data.write().remove(key);
        Ok(())
    }
}
