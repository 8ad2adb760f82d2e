//! TCP Server
//!
//! Accepts connections and dispatches them to a fixed pool of worker threads.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{self, Receiver};
use parking_lot::Mutex;

use crate::config::Config;
use crate::device::Device;
use crate::error::{BlkError, Result};
use crate::protocol::{write_response, Response};

use super::Connection;

/// How long the acceptor sleeps when no connection is pending
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Cloneable flag that stops a running [`Server`]
#[derive(Debug, Clone, Default)]
pub struct ShutdownHandle {
    flag: Arc<AtomicBool>,
}

impl ShutdownHandle {
    /// Ask the server to stop accepting and return from `run`
    pub fn shutdown(&self) {
        self.flag.store(true, Ordering::Release);
    }

    /// Whether shutdown was requested
    pub fn is_shutdown(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

/// Open sessions, keyed by id, so shutdown can close their sockets
#[derive(Default)]
struct SessionRegistry {
    next_id: AtomicUsize,
    streams: Mutex<HashMap<usize, TcpStream>>,
}

impl SessionRegistry {
    /// Track a clone of `stream`; returns the session id
    fn register(&self, stream: &TcpStream) -> Result<usize> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.streams.lock().insert(id, stream.try_clone()?);
        Ok(id)
    }

    fn remove(&self, id: usize) {
        self.streams.lock().remove(&id);
    }

    /// Shut down both directions of every open session
    ///
    /// Workers blocked reading a request see end-of-stream and return.
    fn close_all(&self) -> usize {
        let streams = self.streams.lock();
        for stream in streams.values() {
            let _ = stream.shutdown(Shutdown::Both);
        }
        streams.len()
    }
}

/// TCP server exposing one device
///
/// ## Threads
/// - the caller of [`Server::run`] accepts connections
/// - `worker_threads` workers each serve one connection at a time
/// - a session is admitted only while a worker is free and fewer than
///   `max_connections` sessions are open, so the session limit is
///   `min(worker_threads, max_connections)`; others are refused with an
///   ERROR response
/// - on shutdown, open sessions are closed and `run` returns once every
///   worker has exited
pub struct Server {
    config: Config,
    device: Arc<Device>,
    listener: TcpListener,
    local_addr: SocketAddr,
    shutdown: ShutdownHandle,
    active: Arc<AtomicUsize>,
    sessions: Arc<SessionRegistry>,
}

impl Server {
    /// Bind the listen address from `config`
    pub fn bind(config: Config, device: Arc<Device>) -> Result<Self> {
        let listener = TcpListener::bind(&config.listen_addr).map_err(|e| {
            BlkError::Network(format!("cannot bind {}: {}", config.listen_addr, e))
        })?;
        listener.set_nonblocking(true)?;
        let local_addr = listener.local_addr()?;

        Ok(Self {
            config,
            device,
            listener,
            local_addr,
            shutdown: ShutdownHandle::default(),
            active: Arc::new(AtomicUsize::new(0)),
            sessions: Arc::new(SessionRegistry::default()),
        })
    }

    /// Address actually bound (useful with port 0)
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Handle for stopping the server from another thread
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    /// Signal the server to shutdown gracefully
    pub fn shutdown(&self) {
        self.shutdown.shutdown();
    }

    /// Number of sessions currently open
    pub fn active_connections(&self) -> usize {
        self.active.load(Ordering::Acquire)
    }

    /// Most sessions served at once
    pub fn session_limit(&self) -> usize {
        self.config
            .worker_threads
            .max(1)
            .min(self.config.max_connections)
    }

    /// Accept and serve connections until shutdown is requested (blocking)
    ///
    /// Returns once the acceptor has stopped, open sessions have been closed
    /// and every worker has exited.
    pub fn run(&self) -> Result<()> {
        let limit = self.session_limit();
        tracing::info!(
            addr = %self.local_addr,
            device = %self.device.name(),
            workers = self.config.worker_threads,
            limit,
            "server listening"
        );

        let (tx, rx) = channel::bounded::<(usize, TcpStream)>(limit.max(1));
        let workers = (0..self.config.worker_threads.max(1))
            .map(|id| self.spawn_worker(id, rx.clone()))
            .collect::<Result<Vec<_>>>()?;
        drop(rx);

        while !self.shutdown.is_shutdown() {
            match self.listener.accept() {
                Ok((stream, peer)) => {
                    if self.active.load(Ordering::Acquire) >= limit {
                        tracing::warn!(%peer, limit, "no free session slot, refusing");
                        refuse(stream, self.config.write_timeout_ms);
                        continue;
                    }
                    match self.admit(&tx, stream) {
                        Ok(()) => {}
                        Err(e @ BlkError::Network(_)) => {
                            tracing::error!(%peer, error = %e, "cannot hand off session");
                            break;
                        }
                        Err(e) => {
                            tracing::warn!(%peer, error = %e, "session setup failed");
                        }
                    }
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => {
                    thread::sleep(ACCEPT_POLL_INTERVAL);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "accept failed");
                }
            }
        }

        // Idle workers drain the closed channel; busy ones see their socket shut
        drop(tx);
        let closed = self.sessions.close_all();
        if closed > 0 {
            tracing::info!(sessions = closed, "closing open sessions");
        }
        for worker in workers {
            if worker.join().is_err() {
                tracing::error!("worker thread panicked");
            }
        }

        tracing::info!(addr = %self.local_addr, "server stopped");
        Ok(())
    }

    /// Register a session and pass it to the worker pool
    fn admit(&self, tx: &channel::Sender<(usize, TcpStream)>, stream: TcpStream) -> Result<()> {
        stream.set_nonblocking(false)?;
        let id = self.sessions.register(&stream)?;
        self.active.fetch_add(1, Ordering::AcqRel);

        if tx.send((id, stream)).is_err() {
            self.active.fetch_sub(1, Ordering::AcqRel);
            self.sessions.remove(id);
            return Err(BlkError::Network("all workers exited".to_string()));
        }
        Ok(())
    }

    fn spawn_worker(&self, id: usize, rx: Receiver<(usize, TcpStream)>) -> Result<JoinHandle<()>> {
        let device = Arc::clone(&self.device);
        let active = Arc::clone(&self.active);
        let sessions = Arc::clone(&self.sessions);
        let read_ms = self.config.read_timeout_ms;
        let write_ms = self.config.write_timeout_ms;

        let handle = thread::Builder::new()
            .name(format!("sparseblk-worker-{}", id))
            .spawn(move || {
                for (session, stream) in rx.iter() {
                    if let Err(e) = serve(stream, &device, read_ms, write_ms) {
                        tracing::warn!(worker = id, session, error = %e, "session failed");
                    }
                    sessions.remove(session);
                    active.fetch_sub(1, Ordering::AcqRel);
                }
            })?;
        Ok(handle)
    }
}

fn serve(stream: TcpStream, device: &Arc<Device>, read_ms: u64, write_ms: u64) -> Result<()> {
    let mut connection = Connection::new(stream, Arc::clone(device))?;
    connection.set_timeouts(read_ms, write_ms)?;
    connection.handle()
}

/// Tell a client there is no room for it, then drop the socket
fn refuse(stream: TcpStream, write_ms: u64) {
    let timeout = (write_ms > 0).then(|| Duration::from_millis(write_ms));
    let sent = stream
        .set_nonblocking(false)
        .and_then(|_| stream.set_write_timeout(timeout))
        .map_err(BlkError::from)
        .and_then(|_| {
            let response = Response::error("server busy: no free session slot");
            write_response(&mut &stream, &response)
        });
    if let Err(e) = sent {
        tracing::debug!(error = %e, "refusal not delivered");
    }
}
