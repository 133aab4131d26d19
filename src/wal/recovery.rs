//! WAL Recovery
//!
//! Rebuilds the store from the transaction log on startup, and checks
//! log files offline.

use std::fs::File;
use std::path::Path;
use std::sync::atomic::AtomicU64;
use std::sync::Arc;

use crate::error::{Result, TlogError};
use crate::store::KeyValueStore;
use super::{EventReader, EventType, SequenceCheck, TransactionLog};

/// Startup replay driver
pub struct WalRecovery;

/// Result of a recovery operation
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RecoveryResult {
    /// Number of events applied to the store
    pub events_replayed: u64,

    /// Put events among them
    pub puts: u64,

    /// Delete events among them
    pub deletes: u64,

    /// Sequence the writer continues from
    pub last_sequence: u64,
}

/// Result of an offline verification
#[derive(Debug)]
pub struct VerifyResult {
    /// Events that passed parsing and the sequence check
    pub events: u64,

    /// Sequence of the last accepted event
    pub last_sequence: u64,

    /// First problem found; replay would stop here
    pub error: Option<TlogError>,
}

impl VerifyResult {
    /// Whether the whole file would replay cleanly
    pub fn is_clean(&self) -> bool {
        self.error.is_none()
    }
}

impl WalRecovery {
    /// Replay every logged event into `store`, then start the writer
    ///
    /// This will:
    /// 1. Apply Put/Delete events in file order
    /// 2. Stop at the first read, parse, sequence or apply error and
    ///    return it with the writer still stopped
    /// 3. Start the writer so new mutations continue the sequence
    ///
    /// An error here means the store's history cannot be trusted; the
    /// caller must not serve traffic.
    pub fn recover(log: &dyn TransactionLog, store: &dyn KeyValueStore) -> Result<RecoveryResult> {
        let mut result = RecoveryResult::default();

        for event in log.read_events()? {
            let event = event?;
            match event.event_type {
                EventType::Put => {
                    store.put(&event.key, &event.value)?;
                    result.puts += 1;
                }
                EventType::Delete => {
                    store.delete(&event.key)?;
                    result.deletes += 1;
                }
            }
            result.events_replayed += 1;
        }

        log.run()?;
        result.last_sequence = log.last_sequence();

        tracing::info!(
            events = result.events_replayed,
            puts = result.puts,
            deletes = result.deletes,
            last_sequence = result.last_sequence,
            "transaction log replayed"
        );
        Ok(result)
    }

    /// Check a log file without modifying it
    ///
    /// Only failing to open the file is returned as `Err`; problems inside
    /// the file are reported in `VerifyResult::error`.
    pub fn verify(path: &Path, check: SequenceCheck) -> Result<VerifyResult> {
        let file = File::open(path)?;
        let reader = EventReader::new(file, Arc::new(AtomicU64::new(0))).with_check(check);

        let mut result = VerifyResult {
            events: 0,
            last_sequence: 0,
            error: None,
        };

        for event in reader {
            match event {
                Ok(event) => {
                    result.events += 1;
                    result.last_sequence = event.sequence;
                }
                Err(e) => result.error = Some(e),
            }
        }

        Ok(result)
    }
}
