//! Runtime settings for the transaction log and the TCP server
//!
//! The server binary fills these from command-line flags and environment
//! variables; tests use the builder directly.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Result, TlogError};

/// File name of the transaction log inside `data_dir`
pub const LOG_FILENAME: &str = "transaction.log";

/// Main configuration for a tlogkv instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Transaction Log
    // -------------------------------------------------------------------------
    /// Directory holding `transaction.log`; created on open if missing
    pub data_dir: PathBuf,

    /// Sync strategy: how often the writer fsyncs the log
    pub wal_sync_strategy: WalSyncStrategy,

    /// Number of submitted events that may wait for the writer
    /// before `write_put`/`write_delete` block
    pub queue_capacity: usize,

    /// How long shutdown waits for the writer to drain (milliseconds)
    pub shutdown_timeout_ms: u64,

    // -------------------------------------------------------------------------
    // Server
    // -------------------------------------------------------------------------
    /// Address the accept loop binds
    pub listen_addr: String,

    /// Connections beyond this are answered with ERROR and closed
    pub max_connections: usize,

    /// Per-connection idle timeout (milliseconds, 0 = none)
    pub read_timeout_ms: u64,

    /// Per-response write timeout (milliseconds, 0 = none)
    pub write_timeout_ms: u64,
}

/// When the writer calls `fsync` on the log
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalSyncStrategy {
    /// fsync after every record (safest, slowest)
    EveryWrite,

    /// fsync after N unsynced records (balanced durability/performance)
    EveryNEntries { count: usize },
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./tlogkv_data"),
            wal_sync_strategy: WalSyncStrategy::EveryNEntries { count: 100 },
            queue_capacity: 16,
            shutdown_timeout_ms: 10_000,
            listen_addr: "127.0.0.1:8080".to_string(),
            max_connections: 1024,
            read_timeout_ms: 5000,
            write_timeout_ms: 5000,
        }
    }
}

impl Config {
    /// Start from the defaults
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Path of the transaction log file
    pub fn log_path(&self) -> PathBuf {
        self.data_dir.join(LOG_FILENAME)
    }

    /// Drain timeout as a Duration
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }

    /// Reject settings that would stall or misconfigure the writer/server
    pub fn validate(&self) -> Result<()> {
        if self.queue_capacity == 0 {
            return Err(TlogError::Config("queue_capacity must be at least 1".to_string()));
        }
        if self.max_connections == 0 {
            return Err(TlogError::Config("max_connections must be at least 1".to_string()));
        }
        if let WalSyncStrategy::EveryNEntries { count: 0 } = self.wal_sync_strategy {
            return Err(TlogError::Config("sync batch size must be at least 1".to_string()));
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the data directory (root for the transaction log)
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// How often the writer fsyncs
    pub fn wal_sync_strategy(mut self, strategy: WalSyncStrategy) -> Self {
        self.config.wal_sync_strategy = strategy;
        self
    }

    /// Set the submission queue capacity
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.config.queue_capacity = capacity;
        self
    }

    /// Set the drain timeout used at shutdown (in milliseconds)
    pub fn shutdown_timeout_ms(mut self, ms: u64) -> Self {
        self.config.shutdown_timeout_ms = ms;
        self
    }

    /// `host:port`; port 0 picks a free port
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    pub fn max_connections(mut self, count: usize) -> Self {
        self.config.max_connections = count;
        self
    }

    /// Idle clients are disconnected after this long; 0 disables
    pub fn read_timeout_ms(mut self, ms: u64) -> Self {
        self.config.read_timeout_ms = ms;
        self
    }

    pub fn write_timeout_ms(mut self, ms: u64) -> Self {
        self.config.write_timeout_ms = ms;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
