//! Store Module
//!
//! In-memory key-value state rebuilt from the transaction log.
//!
//! ## Responsibilities
//! - Fast reads and writes in memory
//! - Single-writer/multi-reader access pattern
//! - No durability awareness: the transaction log is authoritative,
//!   the store is a cache of it
//!
//! ## Data Structure Choice
//! HashMap wrapped in RwLock:
//! - Readers proceed concurrently, writers are exclusive
//! - No ordering requirement, nothing is flushed from here

mod memory;

pub use memory::MemoryStore;

use crate::error::Result;

/// Capability contract for the key-value state
///
/// Implementations must be safe to call from many threads at once.
pub trait KeyValueStore: Send + Sync {
    /// Insert or overwrite `key`
    fn put(&self, key: &str, value: &str) -> Result<()>;

    /// Current value of `key`, or `TlogError::KeyNotFound`
    fn get(&self, key: &str) -> Result<String>;

    /// Remove `key`; removing an absent key succeeds
    fn delete(&self, key: &str) -> Result<()>;
}
