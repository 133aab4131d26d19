//! Transaction Log Module
//!
//! Provides durability through an append-only log of mutations.
//!
//! ## Responsibilities
//! - Accept mutation intents without blocking on disk I/O
//! - Assign sequence numbers at write time, single writer thread
//! - Replay the log in order on startup, rejecting out-of-order records
//! - Drain, fsync and close exactly once on shutdown
//!
//! ## File Format
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │ 1 \t 1 \t a \t 1 \n                            │  Put a=1
//! │ 2 \t 1 \t b \t 2 \n                            │  Put b=2
//! │ 3 \t 0 \t a \t   \n                            │  Delete a
//! └──────────────────────────────────────────────┘
//! ```
//! Keys and values cannot contain tabs or newlines.

mod event;
mod logger;
mod reader;
mod recovery;
mod watch;

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam::channel::{self, Receiver, RecvTimeoutError};

use crate::error::{Result, TlogError};

pub use event::{Event, EventType, FIELD_SEPARATOR, RECORD_TERMINATOR};
pub use logger::{FileTransactionLog, DEFAULT_QUEUE_CAPACITY};
pub use reader::{EventReader, SequenceCheck};
pub use recovery::{RecoveryResult, VerifyResult, WalRecovery};
pub use watch::FailureWatch;

/// Boxed replay stream returned by [`TransactionLog::read_events`]
pub type EventStream = Box<dyn Iterator<Item = Result<Event>> + Send>;

/// Capability contract for a durable mutation log
pub trait TransactionLog: Send + Sync {
    /// Queue a Put for the writer; blocks only while the queue is full
    fn write_put(&self, key: &str, value: &str) -> Result<()>;

    /// Queue a Delete for the writer; blocks only while the queue is full
    fn write_delete(&self, key: &str) -> Result<()>;

    /// Stream recorded events from the beginning, in file order
    fn read_events(&self) -> Result<EventStream>;

    /// Start the background writer
    fn run(&self) -> Result<()>;

    /// Drain pending events, fsync and close. Idempotent.
    fn close(&self) -> Result<()>;

    /// Asynchronous write failures
    fn errors(&self) -> Receiver<TlogError>;

    /// Last sequence number replayed or written
    fn last_sequence(&self) -> u64;
}

/// Close `log`, giving up after `timeout`
///
/// A drain that outlives the timeout is reported as
/// `TlogError::ShutdownTimeout`; the close keeps running on its helper
/// thread.
pub fn close_with_timeout(log: Arc<dyn TransactionLog>, timeout: Duration) -> Result<()> {
    let (done_tx, done_rx) = channel::bounded(1);

    thread::Builder::new()
        .name("tlog-close".to_string())
        .spawn(move || {
            let _ = done_tx.send(log.close());
        })?;

    match done_rx.recv_timeout(timeout) {
        Ok(result) => result,
        Err(RecvTimeoutError::Timeout) => Err(TlogError::ShutdownTimeout(timeout)),
        Err(RecvTimeoutError::Disconnected) => {
            Err(TlogError::InvalidState("close thread exited without a result".to_string()))
        }
    }
}

/// Log that records nothing
///
/// Accepts every submission in any state and replays an empty history.
#[derive(Debug, Default)]
pub struct NoopTransactionLog {
    submitted: AtomicU64,
    running: AtomicBool,
}

impl NoopTransactionLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of events handed to this log
    pub fn submitted(&self) -> u64 {
        self.submitted.load(Ordering::SeqCst)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

impl TransactionLog for NoopTransactionLog {
    fn write_put(&self, _key: &str, _value: &str) -> Result<()> {
        self.submitted.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn write_delete(&self, _key: &str) -> Result<()> {
        self.submitted.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn read_events(&self) -> Result<EventStream> {
        Ok(Box::new(std::iter::empty()))
    }

    fn run(&self) -> Result<()> {
        self.running.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn close(&self) -> Result<()> {
        self.running.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn errors(&self) -> Receiver<TlogError> {
        channel::never()
    }

    fn last_sequence(&self) -> u64 {
        0
    }
}
