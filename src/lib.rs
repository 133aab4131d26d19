//! # tlogkv
//!
//! A single-node key-value store whose durability comes from an
//! append-only transaction log:
//! - Mutations update an in-memory map, then queue a log event
//! - One background thread numbers and appends events
//! - Startup replays the log, rejecting malformed or out-of-order records
//! - Clients talk to it over a small binary TCP protocol
//!
//! ## Data Flow
//!
//! ```text
//!  client ──frame──► network::Connection ──Command──► KeyService
//!                                                      │     │
//!                                     1. store.put/del │     │ 2. write_put/del
//!                                                      ▼     ▼
//!                                             MemoryStore   FileTransactionLog
//!                                                 ▲               │ bounded queue
//!                                          replay │               ▼
//!            transaction.log ──► WalRecovery ─────┘         writer thread ──► transaction.log
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod wal;
pub mod store;
pub mod service;
pub mod network;
pub mod protocol;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{TlogError, Result};
pub use config::Config;
pub use service::KeyService;
pub use store::{KeyValueStore, MemoryStore};
pub use wal::{FileTransactionLog, TransactionLog, WalRecovery};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of tlogkv
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
