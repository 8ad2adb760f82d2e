//! Connection Handler
//!
//! Serves one client: decode a command, run it against the device, answer.

use std::io::{BufReader, BufWriter, ErrorKind};
use std::net::TcpStream;
use std::sync::Arc;
use std::time::Duration;

use crate::device::Device;
use crate::error::{BlkError, Result};
use crate::protocol::{read_command, write_response, Command, Response};

/// Handles a single client connection
pub struct Connection {
    /// Buffered read half
    reader: BufReader<TcpStream>,

    /// Buffered write half
    writer: BufWriter<TcpStream>,

    /// Device the commands run against
    device: Arc<Device>,

    /// Peer address for logging
    peer_addr: String,
}

impl Connection {
    /// Wrap an accepted stream
    pub fn new(stream: TcpStream, device: Arc<Device>) -> Result<Self> {
        let peer_addr = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        // Requests are small and latency bound
        stream.set_nodelay(true)?;
        let read_half = stream.try_clone()?;

        Ok(Self {
            reader: BufReader::new(read_half),
            writer: BufWriter::new(stream),
            device,
            peer_addr,
        })
    }

    /// Configure socket timeouts (0 = block forever)
    pub fn set_timeouts(&mut self, read_ms: u64, write_ms: u64) -> Result<()> {
        let to_duration = |ms: u64| (ms > 0).then(|| Duration::from_millis(ms));
        self.reader.get_ref().set_read_timeout(to_duration(read_ms))?;
        self.writer.get_ref().set_write_timeout(to_duration(write_ms))?;
        Ok(())
    }

    /// Serve requests until the peer goes away
    ///
    /// A peer hanging up, resetting, or idling past the read timeout ends the
    /// session with `Ok`. Malformed frames get an ERROR response and end the
    /// session with the decode error.
    pub fn handle(&mut self) -> Result<()> {
        tracing::debug!(peer = %self.peer_addr, "session started");

        loop {
            let command = match read_command(&mut self.reader) {
                Ok(command) => command,
                Err(BlkError::Io(ref e)) if ends_session(e.kind()) => {
                    tracing::debug!(peer = %self.peer_addr, reason = %e, "session ended");
                    return Ok(());
                }
                Err(e) => {
                    tracing::warn!(peer = %self.peer_addr, error = %e, "bad request");
                    let _ = self.send_response(Response::from_error(&e));
                    return Err(e);
                }
            };

            tracing::trace!(peer = %self.peer_addr, ?command, "request");
            let response = self.execute_command(command);

            match self.send_response(response) {
                Ok(()) => {}
                Err(BlkError::Io(ref e)) if ends_session(e.kind()) => {
                    tracing::debug!(peer = %self.peer_addr, reason = %e, "peer left before reply");
                    return Ok(());
                }
                Err(e) => {
                    tracing::warn!(peer = %self.peer_addr, error = %e, "reply failed");
                    return Err(e);
                }
            }
        }
    }

    /// Run a command, folding failures into the response status
    fn execute_command(&self, command: Command) -> Response {
        match self.device.execute(command) {
            Ok(payload) => Response::ok(payload),
            Err(e) => {
                tracing::debug!(peer = %self.peer_addr, error = %e, "command failed");
                Response::from_error(&e)
            }
        }
    }

    fn send_response(&mut self, response: Response) -> Result<()> {
        write_response(&mut self.writer, &response)
    }

    /// Get the peer address string
    pub fn peer_addr(&self) -> &str {
        &self.peer_addr
    }
}

/// I/O error kinds that mean the peer is gone (or idle), not that we failed
fn ends_session(kind: ErrorKind) -> bool {
    matches!(
        kind,
        ErrorKind::UnexpectedEof
            | ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::BrokenPipe
            | ErrorKind::WouldBlock
            | ErrorKind::TimedOut
    )
}
