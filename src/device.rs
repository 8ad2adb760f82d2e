//! Device
//!
//! A named device around one shared [`Store`], and the file handles opened on
//! it.
//!
//! ## Responsibilities
//! - Own the store for the lifetime of the device
//! - Hand out stateless file handles (`open` / `close` always succeed)
//! - Expose the integer file-operation surface: byte counts and positions on
//!   success, `-errno` on failure
//! - Route protocol commands to the store

use std::io;
use std::sync::Arc;

use crate::config::{Config, BLOCK_SIZE};
use crate::cursor::Whence;
use crate::error::{BlkError, Result};
use crate::protocol::Command;
use crate::store::{DeviceStats, Store};

/// A named block device backed by a sparse store
pub struct Device {
    name: String,
    store: Arc<Store>,
}

impl Device {
    /// Create the device and its store
    pub fn new(config: &Config) -> Result<Self> {
        config.validate()?;
        let store = Store::new(config)?;

        tracing::info!(
            name = %config.device_name,
            initial_capacity = config.initial_capacity,
            growth = ?config.growth_policy,
            "device created"
        );

        Ok(Self {
            name: config.device_name.clone(),
            store: Arc::new(store),
        })
    }

    /// Open a handle on the device
    pub fn open(&self) -> DeviceFile {
        DeviceFile {
            store: Arc::clone(&self.store),
        }
    }

    /// Execute a protocol command
    ///
    /// Returns the response payload for successful commands.
    pub fn execute(&self, command: Command) -> Result<Option<Vec<u8>>> {
        match command {
            Command::Read { offset, length } => {
                // A single read never returns more than one block
                let length = length as usize;
                let mut buf = vec![0u8; length.min(BLOCK_SIZE)];
                let read = self.store.read(offset, &mut buf[..], length)?;
                buf.truncate(read);
                Ok(Some(buf))
            }
            Command::Write { offset, data } => {
                let written = self.store.write(offset, &data, data.len())?;
                Ok(Some((written as u64).to_be_bytes().to_vec()))
            }
            Command::Seek { offset, whence } => {
                let position = self.store.seek_raw(offset, i32::from(whence));
                Ok(Some(position.to_be_bytes().to_vec()))
            }
            Command::Stat => Ok(Some(bincode::serialize(&self.stats())?)),
            Command::Ping => Ok(Some(b"PONG".to_vec())),
        }
    }

    /// Device name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Shared store
    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    /// Snapshot of the store
    pub fn stats(&self) -> DeviceStats {
        self.store.stats()
    }
}

impl Drop for Device {
    fn drop(&mut self) {
        tracing::info!(name = %self.name, "device removed");
    }
}

/// An open handle on a [`Device`]
///
/// Handles carry no state of their own: every handle shares the store's
/// single cursor.
#[derive(Clone)]
pub struct DeviceFile {
    store: Arc<Store>,
}

impl DeviceFile {
    /// Read at `offset`; returns bytes read or `-errno`
    pub fn read(&self, offset: u64, buf: &mut [u8], length: usize) -> i64 {
        to_sentinel(self.store.read(offset, buf, length))
    }

    /// Write at `offset`; returns bytes written or `-errno`
    pub fn write(&self, offset: u64, buf: &[u8], length: usize) -> i64 {
        to_sentinel(self.store.write(offset, buf, length))
    }

    /// Seek with a raw whence (`SEEK_SET`, `SEEK_CUR`, `SEEK_END`)
    ///
    /// Unknown whence values are a no-op returning the current position.
    pub fn seek(&self, offset: i64, whence: i32) -> i64 {
        self.store.seek_raw(offset, whence)
    }

    /// Seek with a typed whence
    pub fn seek_to(&self, offset: i64, whence: Whence) -> i64 {
        self.store.seek(offset, whence)
    }

    /// Current position
    pub fn position(&self) -> i64 {
        self.store.position()
    }

    /// Release the handle
    pub fn close(self) {}
}

fn to_sentinel(result: Result<usize>) -> i64 {
    match result {
        Ok(n) => n as i64,
        Err(e) => e.errno(),
    }
}

fn to_io_error(e: BlkError) -> io::Error {
    match e {
        BlkError::Io(e) => e,
        BlkError::OutOfMemory(_) => io::Error::new(io::ErrorKind::OutOfMemory, e),
        BlkError::NegativePosition(_) => io::Error::new(io::ErrorKind::InvalidInput, e),
        other => io::Error::new(io::ErrorKind::Other, other),
    }
}

// =============================================================================
// std::io adapters (sequential access at the cursor)
// =============================================================================

impl io::Read for DeviceFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let length = buf.len();
        self.store.read_next(buf, length).map_err(to_io_error)
    }
}

impl io::Write for DeviceFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.store.write_next(buf, buf.len()).map_err(to_io_error)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
