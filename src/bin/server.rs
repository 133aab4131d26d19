//! tlogkv Server Binary
//!
//! Replays the transaction log, then serves the store over TCP until
//! Ctrl+C/SIGTERM or a log write failure.

use std::process::ExitCode;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use clap::Parser;
use tlogkv::config::WalSyncStrategy;
use tlogkv::network::Server;
use tlogkv::wal::{close_with_timeout, FailureWatch};
use tlogkv::{Config, FileTransactionLog, KeyService, MemoryStore, TransactionLog, WalRecovery};
use tracing_subscriber::{fmt, EnvFilter};

/// tlogkv Server
#[derive(Parser, Debug)]
#[command(name = "tlogkv-server")]
#[command(about = "Key-value store backed by an append-only transaction log")]
#[command(version)]
struct Args {
    /// Data directory (holds transaction.log)
    #[arg(short, long, env = "TLOGKV_DATA_DIR", default_value = "./tlogkv_data")]
    data_dir: String,

    /// Listen address (host:port)
    #[arg(short, long, env = "TLOGKV_LISTEN", default_value = "127.0.0.1:8080")]
    listen: String,

    /// Maximum concurrent connections
    #[arg(short, long, env = "TLOGKV_MAX_CONNECTIONS", default_value = "1024")]
    max_connections: usize,

    /// fsync after this many records (0 = after every record)
    #[arg(long, env = "TLOGKV_SYNC_EVERY", default_value = "100")]
    sync_every: usize,

    /// Events that may wait for the log writer before clients block
    #[arg(long, env = "TLOGKV_QUEUE_CAPACITY", default_value = "16")]
    queue_capacity: usize,

    /// How long shutdown waits for the log to drain (milliseconds)
    #[arg(long, env = "TLOGKV_SHUTDOWN_TIMEOUT_MS", default_value = "10000")]
    shutdown_timeout_ms: u64,

    /// Log level used when RUST_LOG is unset
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,
}

impl Args {
    fn config(&self) -> Config {
        let sync = match self.sync_every {
            0 => WalSyncStrategy::EveryWrite,
            count => WalSyncStrategy::EveryNEntries { count },
        };

        Config::builder()
            .data_dir(&self.data_dir)
            .listen_addr(&self.listen)
            .max_connections(self.max_connections)
            .wal_sync_strategy(sync)
            .queue_capacity(self.queue_capacity)
            .shutdown_timeout_ms(self.shutdown_timeout_ms)
            .build()
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},tlogkv={}", args.log_level, args.log_level)));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    tracing::info!("tlogkv Server v{}", tlogkv::VERSION);
    tracing::info!("Data directory: {}", args.data_dir);
    tracing::info!("Listen address: {}", args.listen);

    let config = args.config();

    match serve(config) {
        Ok(()) => {
            tracing::info!("Server stopped");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("Server error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn serve(config: Config) -> tlogkv::Result<()> {
    let log = Arc::new(FileTransactionLog::from_config(&config)?);
    let store = Arc::new(MemoryStore::new());

    // Serving a store whose history failed verification is unsafe
    let recovery = WalRecovery::recover(&*log, &*store)?;
    tracing::info!(
        "Recovered {} events ({} keys live), continuing at sequence {}",
        recovery.events_replayed,
        store.len(),
        recovery.last_sequence
    );

    let service = Arc::new(KeyService::new(store, log.clone()));
    let server = Server::bind(config.clone(), service)?;

    // A failed append breaks the durability contract: stop serving
    let watch = FailureWatch::spawn(log.errors(), server.shutdown_handle())?;

    let stop_on_signal = server.shutdown_handle();
    ctrlc::set_handler(move || {
        tracing::info!("Received shutdown signal, initiating shutdown...");
        stop_on_signal.store(true, Ordering::SeqCst);
    })
    .map_err(|e| tlogkv::TlogError::Config(format!("cannot install signal handler: {}", e)))?;

    let served = server.run();

    tracing::info!("Closing transaction log");
    let closed = close_with_timeout(log, config.shutdown_timeout());

    if let Some(e) = watch.take_failure() {
        if let Err(close_error) = closed {
            tracing::error!("Transaction log close failed: {}", close_error);
        }
        return Err(e);
    }
    served.and(closed)
}
