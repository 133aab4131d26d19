//! File Transaction Log
//!
//! Owns the log file. Replay reads it from the start; afterwards a single
//! background thread appends every submitted event.
//!
//! ## Lifecycle
//! ```text
//! open ──► Opened ──(read_events, run)──► Active ──(close)──► Closed
//!            │                                                  ▲
//!            └──────────────────(close)─────────────────────────┘
//! ```

use std::fs::{self, File, OpenOptions};
use std::io::{Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam::channel::{self, Receiver, Sender};
use parking_lot::{Mutex, RwLock};

use crate::config::{Config, WalSyncStrategy};
use crate::error::{Result, TlogError};
use super::{Event, EventReader, EventStream, TransactionLog};

/// Default number of queued events before submitters block
pub const DEFAULT_QUEUE_CAPACITY: usize = 16;

enum LogState {
    /// File open, writer not started; replay allowed
    Opened { file: File },

    /// Writer thread owns the file and hands it back when it exits
    Active { writer: JoinHandle<File> },

    Closed,
}

/// Append-only transaction log backed by a single file
///
/// ## Concurrency:
/// - `write_put`/`write_delete`: any number of threads, each only enqueues
/// - Writer thread: the only code that appends to the file
/// - `state`: serializes run/close/read_events transitions
pub struct FileTransactionLog {
    /// Location of the log file
    path: PathBuf,

    /// How often the writer fsyncs
    sync_strategy: WalSyncStrategy,

    /// Bounded queue size for submitted events
    queue_capacity: usize,

    /// Last sequence seen by replay or assigned by the writer
    last_sequence: Arc<AtomicU64>,

    /// Submission side of the event queue, present only while Active
    events: RwLock<Option<Sender<Event>>>,

    /// Write failures reported by the writer thread
    errors_tx: Sender<TlogError>,
    errors_rx: Receiver<TlogError>,

    state: Mutex<LogState>,
}

impl FileTransactionLog {
    /// Open or create the log file for reading and appending
    ///
    /// Does not start the writer.
    pub fn open(path: &Path, sync_strategy: WalSyncStrategy) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(path)?;

        // The writer stops after its first failure, so one slot is enough
        let (errors_tx, errors_rx) = channel::bounded(1);

        tracing::debug!(path = %path.display(), "transaction log opened");

        Ok(Self {
            path: path.to_path_buf(),
            sync_strategy,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            last_sequence: Arc::new(AtomicU64::new(0)),
            events: RwLock::new(None),
            errors_tx,
            errors_rx,
            state: Mutex::new(LogState::Opened { file }),
        })
    }

    /// Open the log described by `config`, creating `data_dir` if needed
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;
        fs::create_dir_all(&config.data_dir)?;
        Ok(Self::open(&config.log_path(), config.wal_sync_strategy)?
            .with_queue_capacity(config.queue_capacity))
    }

    /// Set how many events may be queued before submitters block
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity.max(1);
        self
    }

    /// Path of the underlying file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the writer thread has been started and not yet closed
    pub fn is_running(&self) -> bool {
        matches!(*self.state.lock(), LogState::Active { .. })
    }

    fn submit(&self, event: Event) -> Result<()> {
        // Clone the sender so a full queue never blocks close()
        let sender = self.events.read().clone().ok_or(TlogError::NotRunning)?;
        sender.send(event).map_err(|_| TlogError::WriterStopped)
    }
}

impl TransactionLog for FileTransactionLog {
    fn write_put(&self, key: &str, value: &str) -> Result<()> {
        self.submit(Event::put(0, key, value))
    }

    fn write_delete(&self, key: &str) -> Result<()> {
        self.submit(Event::delete(0, key))
    }

    fn read_events(&self) -> Result<EventStream> {
        let state = self.state.lock();
        let LogState::Opened { file } = &*state else {
            return Err(TlogError::InvalidState(
                "events can only be replayed before the writer starts".to_string(),
            ));
        };

        let mut source = file.try_clone()?;
        source.seek(SeekFrom::Start(0))?;

        Ok(Box::new(EventReader::new(source, Arc::clone(&self.last_sequence))))
    }

    fn run(&self) -> Result<()> {
        let mut state = self.state.lock();
        let file = match std::mem::replace(&mut *state, LogState::Closed) {
            LogState::Opened { file } => file,
            other => {
                *state = other;
                return Err(TlogError::InvalidState("writer already started or log closed".to_string()));
            }
        };

        let (tx, rx) = channel::bounded(self.queue_capacity);
        let worker = Writer {
            file,
            sync_strategy: self.sync_strategy,
            last_sequence: Arc::clone(&self.last_sequence),
            errors: self.errors_tx.clone(),
            unsynced: 0,
        };

        let writer = thread::Builder::new()
            .name("tlog-writer".to_string())
            .spawn(move || worker.run(rx))?;

        *self.events.write() = Some(tx);
        *state = LogState::Active { writer };

        tracing::info!(
            path = %self.path.display(),
            last_sequence = self.last_sequence.load(Ordering::SeqCst),
            "transaction log writer started"
        );
        Ok(())
    }

    fn close(&self) -> Result<()> {
        let mut state = self.state.lock();
        let file = match std::mem::replace(&mut *state, LogState::Closed) {
            LogState::Closed => return Ok(()),
            LogState::Opened { file } => file,
            LogState::Active { writer } => {
                // Dropping the only sender ends the writer once the queue is empty
                self.events.write().take();
                writer
                    .join()
                    .map_err(|_| TlogError::InvalidState("writer thread panicked".to_string()))?
            }
        };

        file.sync_all()?;
        drop(file);

        tracing::info!(
            path = %self.path.display(),
            last_sequence = self.last_sequence.load(Ordering::SeqCst),
            "transaction log closed"
        );
        Ok(())
    }

    fn errors(&self) -> Receiver<TlogError> {
        self.errors_rx.clone()
    }

    fn last_sequence(&self) -> u64 {
        self.last_sequence.load(Ordering::SeqCst)
    }
}

impl Drop for FileTransactionLog {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            tracing::warn!(path = %self.path.display(), error = %e, "transaction log close on drop failed");
        }
    }
}

/// Sends an error if the writer thread unwinds, so `errors()` sees every stop
struct PanicReport(Sender<TlogError>);

impl Drop for PanicReport {
    fn drop(&mut self) {
        if thread::panicking() {
            let _ = self.0.try_send(TlogError::InvalidState("writer thread panicked".to_string()));
        }
    }
}

/// Background appender; the only owner of the file while Active
struct Writer {
    file: File,
    sync_strategy: WalSyncStrategy,
    last_sequence: Arc<AtomicU64>,
    errors: Sender<TlogError>,
    unsynced: usize,
}

impl Writer {
    fn run(mut self, events: Receiver<Event>) -> File {
        let _panic_report = PanicReport(self.errors.clone());

        // Ends once every sender is gone and the queue is drained
        for mut event in events.iter() {
            // Only this thread advances the counter while Active
            let previous = self.last_sequence.load(Ordering::SeqCst);
            let Some(sequence) = previous.checked_add(1) else {
                let e = TlogError::InvalidState(format!("sequence numbers exhausted after {}", previous));
                return self.fail(e, previous);
            };
            event.sequence = sequence;

            if let Err(e) = self.append(&event) {
                return self.fail(e, sequence);
            }
            self.last_sequence.store(sequence, Ordering::SeqCst);
        }
        self.file
    }

    /// Report the one error that stops the writer and give the file back
    fn fail(self, error: TlogError, sequence: u64) -> File {
        tracing::error!(sequence, error = %error, "transaction log writer stopped");
        let _ = self.errors.try_send(error);
        self.file
    }

    fn append(&mut self, event: &Event) -> Result<()> {
        event.write_to(&mut self.file)?;
        self.unsynced += 1;

        let due = match self.sync_strategy {
            WalSyncStrategy::EveryWrite => true,
            WalSyncStrategy::EveryNEntries { count } => self.unsynced >= count,
        };
        if due {
            self.file.sync_data()?;
            self.unsynced = 0;
        }
        Ok(())
    }
}
