//! Per-client request loop
//!
//! Reads one frame, runs it against the shared [`KeyService`], writes one
//! response, and repeats until the client leaves or goes idle.

use std::io::{self, BufReader, BufWriter, ErrorKind};
use std::net::TcpStream;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{Result, TlogError};
use crate::protocol::{read_command, write_response, Command, Response};
use crate::service::KeyService;

/// One accepted client socket
pub struct Connection {
    reader: BufReader<TcpStream>,
    writer: BufWriter<TcpStream>,
    service: Arc<KeyService>,

    /// Rendered once for log fields
    peer_addr: String,
}

/// Errors that mean the client went away rather than the server failing
fn is_disconnect(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        ErrorKind::UnexpectedEof
            | ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::BrokenPipe
    )
}

/// Read timeouts surface as WouldBlock on Unix and TimedOut on Windows
fn is_timeout(error: &io::Error) -> bool {
    matches!(error.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut)
}

impl Connection {
    pub fn new(stream: TcpStream, service: Arc<KeyService>) -> Result<Self> {
        let peer_addr = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        // One small response per request: don't let Nagle hold it back
        stream.set_nodelay(true)?;

        let read_stream = stream.try_clone()?;

        Ok(Self {
            reader: BufReader::new(read_stream),
            writer: BufWriter::new(stream),
            service,
            peer_addr,
        })
    }

    /// Configure connection timeouts; zero leaves a direction unbounded
    pub fn set_timeouts(&mut self, read_ms: u64, write_ms: u64) -> Result<()> {
        let to_timeout = |ms: u64| (ms > 0).then(|| Duration::from_millis(ms));

        self.reader.get_ref().set_read_timeout(to_timeout(read_ms))?;
        self.writer.get_ref().set_write_timeout(to_timeout(write_ms))?;
        Ok(())
    }

    /// Serve commands until the client disconnects, idles past the read
    /// timeout, or an unrecoverable error occurs
    pub fn handle(&mut self) -> Result<()> {
        tracing::debug!(peer = %self.peer_addr, "connection established");

        loop {
            let command = match read_command(&mut self.reader) {
                Ok(cmd) => cmd,
                Err(TlogError::Io(ref e)) if is_disconnect(e) => {
                    tracing::debug!(peer = %self.peer_addr, "client disconnected");
                    return Ok(());
                }
                Err(TlogError::Io(ref e)) if is_timeout(e) => {
                    tracing::debug!(peer = %self.peer_addr, "read timeout, closing");
                    return Ok(());
                }
                Err(e) => {
                    tracing::warn!(peer = %self.peer_addr, error = %e, "bad request");
                    // Framing is lost after a bad frame, so answer and hang up
                    let _ = self.send_response(Response::from_error(&e));
                    return Err(e);
                }
            };

            tracing::trace!(
                peer = %self.peer_addr,
                command = command.command_type().name(),
                key = command.key(),
                mutation = command.is_mutation(),
                "received command"
            );

            let response = self.execute_command(command);

            match self.send_response(response) {
                Ok(()) => {}
                Err(TlogError::Io(ref e)) if is_disconnect(e) => {
                    tracing::debug!(peer = %self.peer_addr, "client left before the response was sent");
                    return Ok(());
                }
                Err(e) => {
                    tracing::warn!(peer = %self.peer_addr, error = %e, "write failed");
                    return Err(e);
                }
            }
        }
    }

    fn execute_command(&self, command: Command) -> Response {
        match self.service.execute(command) {
            Ok(value) => Response::ok(value.map(String::into_bytes)),
            Err(e) => {
                if !matches!(e, TlogError::KeyNotFound) {
                    tracing::debug!(peer = %self.peer_addr, error = %e, "command failed");
                }
                Response::from_error(&e)
            }
        }
    }

    fn send_response(&mut self, response: Response) -> Result<()> {
        write_response(&mut self.writer, &response)
    }

    pub fn peer_addr(&self) -> &str {
        &self.peer_addr
    }
}
