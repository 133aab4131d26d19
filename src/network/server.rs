//! TCP Server
//!
//! Accepts connections and serves each one on its own thread.

use std::io::ErrorKind;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::config::Config;
use crate::error::Result;
use crate::protocol::{write_response, Response};
use crate::service::KeyService;
use super::Connection;

/// How long the accept loop sleeps when no client is waiting
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// TCP server for tlogkv
pub struct Server {
    config: Config,
    service: Arc<KeyService>,
    listener: TcpListener,
    shutdown: Arc<AtomicBool>,
    active: Arc<AtomicUsize>,
}

/// Decrements the live connection count when a handler thread ends
struct ActiveGuard(Arc<AtomicUsize>);

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Server {
    /// Bind the listen address from `config`
    pub fn bind(config: Config, service: Arc<KeyService>) -> Result<Self> {
        let listener = TcpListener::bind(&config.listen_addr)?;
        // Non-blocking accept so the loop can notice shutdown
        listener.set_nonblocking(true)?;

        Ok(Self {
            config,
            service,
            listener,
            shutdown: Arc::new(AtomicBool::new(false)),
            active: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Address actually bound (useful with port 0)
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Flag that stops the accept loop when set
    pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    /// Signal the server to shutdown gracefully
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    /// Number of connections currently being served
    pub fn active_connections(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Accept clients until shutdown is signalled (blocking)
    ///
    /// After the loop ends, waits up to one read+write timeout for open
    /// connections to finish before returning.
    pub fn run(&self) -> Result<()> {
        tracing::info!(addr = %self.local_addr()?, "server listening");

        while !self.shutdown.load(Ordering::SeqCst) {
            match self.listener.accept() {
                Ok((stream, addr)) => self.dispatch(stream, addr),
                Err(e) if e.kind() == ErrorKind::WouldBlock => thread::sleep(ACCEPT_POLL_INTERVAL),
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => {
                    tracing::warn!(error = %e, "accept failed");
                    thread::sleep(ACCEPT_POLL_INTERVAL);
                }
            }
        }

        self.wait_for_connections();
        tracing::info!("server stopped accepting connections");
        Ok(())
    }

    fn dispatch(&self, stream: TcpStream, addr: SocketAddr) {
        if self.active.load(Ordering::SeqCst) >= self.config.max_connections {
            tracing::warn!(peer = %addr, limit = self.config.max_connections, "connection limit reached");
            reject(stream, "server busy");
            return;
        }

        // Accepted sockets inherit non-blocking mode on some platforms
        if let Err(e) = stream.set_nonblocking(false) {
            tracing::warn!(peer = %addr, error = %e, "could not configure connection");
            return;
        }

        self.active.fetch_add(1, Ordering::SeqCst);
        let guard = ActiveGuard(Arc::clone(&self.active));
        let service = Arc::clone(&self.service);
        let (read_ms, write_ms) = (self.config.read_timeout_ms, self.config.write_timeout_ms);

        let spawned = thread::Builder::new()
            .name(format!("conn-{}", addr))
            .spawn(move || {
                let _guard = guard;
                let result = Connection::new(stream, service).and_then(|mut conn| {
                    conn.set_timeouts(read_ms, write_ms)?;
                    conn.handle()
                });
                if let Err(e) = result {
                    tracing::debug!(peer = %addr, error = %e, "connection ended with error");
                }
            });

        if let Err(e) = spawned {
            tracing::error!(peer = %addr, error = %e, "failed to spawn connection thread");
        }
    }

    fn wait_for_connections(&self) {
        let grace = Duration::from_millis(self.config.read_timeout_ms + self.config.write_timeout_ms);
        let deadline = Instant::now() + grace;

        while self.active_connections() > 0 && Instant::now() < deadline {
            thread::sleep(ACCEPT_POLL_INTERVAL);
        }

        let remaining = self.active_connections();
        if remaining > 0 {
            tracing::warn!(connections = remaining, "shutting down with connections still open");
        }
    }
}

fn reject(mut stream: TcpStream, reason: &str) {
    let _ = stream.set_nonblocking(false);
    let _ = write_response(&mut stream, &Response::error(reason));
}
