//! Log failure watcher
//!
//! Turns the first asynchronous write failure into a shutdown request and
//! keeps the error so the process can exit with it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use crossbeam::channel::Receiver;
use parking_lot::Mutex;

use crate::error::{Result, TlogError};

/// Background thread waiting on a log's error channel
pub struct FailureWatch {
    failure: Arc<Mutex<Option<TlogError>>>,
}

impl FailureWatch {
    /// Start watching `errors`; the first one received sets `shutdown`
    ///
    /// The failure is recorded before the flag is raised, so anyone who
    /// sees the flag can also see the failure.
    pub fn spawn(errors: Receiver<TlogError>, shutdown: Arc<AtomicBool>) -> Result<Self> {
        let failure = Arc::new(Mutex::new(None));
        let slot = Arc::clone(&failure);

        thread::Builder::new()
            .name("tlog-errors".to_string())
            .spawn(move || {
                if let Ok(e) = errors.recv() {
                    tracing::error!(error = %e, "transaction log failure, shutting down");
                    *slot.lock() = Some(e);
                    shutdown.store(true, Ordering::SeqCst);
                }
            })?;

        Ok(Self { failure })
    }

    pub fn has_failed(&self) -> bool {
        self.failure.lock().is_some()
    }

    /// The recorded failure, if any; later calls return `None`
    pub fn take_failure(&self) -> Option<TlogError> {
        self.failure.lock().take()
    }
}
