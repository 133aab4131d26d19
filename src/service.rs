//! Service Module
//!
//! The boundary the network layer calls into: validates input, applies the
//! mutation to the store, then hands the durability intent to the log.
//!
//! ## Ordering
//! The in-memory write happens first so a client can read its own write
//! immediately. The two steps are not atomic: a crash after the store
//! update but before the writer appends the record loses that mutation on
//! restart. The log, not the map, is authoritative.

use std::sync::Arc;

use crate::error::{Result, TlogError};
use crate::protocol::Command;
use crate::store::KeyValueStore;
use crate::wal::{TransactionLog, FIELD_SEPARATOR, RECORD_TERMINATOR};

/// Store + log pair shared by every connection
#[derive(Clone)]
pub struct KeyService {
    store: Arc<dyn KeyValueStore>,
    log: Arc<dyn TransactionLog>,
}

impl KeyService {
    pub fn new(store: Arc<dyn KeyValueStore>, log: Arc<dyn TransactionLog>) -> Self {
        Self { store, log }
    }

    /// Execute a command
    ///
    /// Routes commands to appropriate handlers
    pub fn execute(&self, command: Command) -> Result<Option<String>> {
        match command {
            Command::Get { key } => self.get(&key).map(Some),
            Command::Put { key, value } => {
                self.put(&key, &value)?;
                Ok(None)
            }
            Command::Delete { key } => {
                self.delete(&key)?;
                Ok(None)
            }
            Command::Ping => Ok(Some("PONG".to_string())),
        }
    }

    /// Store `value` under `key` and queue the Put for the log
    pub fn put(&self, key: &str, value: &str) -> Result<()> {
        validate_key(key)?;
        validate_value(value)?;

        self.store.put(key, value)?;
        self.log.write_put(key, value)
    }

    /// Current value of `key`
    pub fn get(&self, key: &str) -> Result<String> {
        validate_key(key)?;
        self.store.get(key)
    }

    /// Remove `key` and queue the Delete for the log
    pub fn delete(&self, key: &str) -> Result<()> {
        validate_key(key)?;

        self.store.delete(key)?;
        self.log.write_delete(key)
    }

    pub fn store(&self) -> &Arc<dyn KeyValueStore> {
        &self.store
    }

    pub fn log(&self) -> &Arc<dyn TransactionLog> {
        &self.log
    }
}

fn has_separator(text: &str) -> bool {
    text.contains(FIELD_SEPARATOR) || text.contains(RECORD_TERMINATOR)
}

fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(TlogError::InvalidKey("empty key".to_string()));
    }
    if has_separator(key) {
        return Err(TlogError::InvalidKey("key contains a tab or newline".to_string()));
    }
    Ok(())
}

fn validate_value(value: &str) -> Result<()> {
    if has_separator(value) {
        return Err(TlogError::InvalidValue("value contains a tab or newline".to_string()));
    }
    Ok(())
}
