//! Store
//!
//! The sparse block store: directory, allocator, cursor and the two locks
//! that serialize access to them.
//!
//! ## Concurrency Model: two coarse exclusive locks
//!
//! - **data lock**: directory growth, block allocation, every block copy and
//!   the position commit that follows a copy
//! - **cursor lock**: seek
//!
//! The locks are never nested. Reads and writes take only the data lock,
//! seeks take only the cursor lock. Two transfers never run in parallel, even
//! at unrelated offsets.
//!
//! ## Transfer shape
//! ```text
//!   offset ──► (index = offset / BLOCK_SIZE, within = offset % BLOCK_SIZE)
//!
//!   block[index]: ├────────── within ──────────┼──── BLOCK_SIZE - within ────┤
//!                                              ▲
//!                                  transfer starts here and stops at the
//!                                  block end or after `length` bytes
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::allocator::BlockAllocator;
use crate::config::{Config, BLOCK_SIZE};
use crate::cursor::{Cursor, Whence};
use crate::directory::BlockDirectory;
use crate::error::{BlkError, Result};
use crate::transfer::{TransferSink, TransferSource};

/// Point-in-time view of a store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceStats {
    /// Bytes per block
    pub block_size: u64,

    /// Directory capacity in slots
    pub capacity: u64,

    /// Slots holding a block
    pub allocated_blocks: u64,

    /// Cursor position
    pub position: i64,
}

/// State guarded by the data lock
struct DataPlane {
    directory: BlockDirectory,
    allocator: BlockAllocator,
}

/// Sparse, lazily allocated block store
pub struct Store {
    /// Directory + allocator (the data lock)
    data: Mutex<DataPlane>,

    /// Serializes seeks
    cursor_lock: Mutex<()>,

    /// Current position
    cursor: Cursor,

    /// Directory capacity, mirrored for END seeks
    capacity: AtomicUsize,
}

impl Store {
    /// Create a store from the directory/allocator/cursor parts of `config`
    pub fn new(config: &Config) -> Result<Self> {
        let directory = BlockDirectory::new(
            config.initial_capacity,
            config.growth_policy,
            config.max_capacity,
        )?;
        let capacity = directory.capacity();

        Ok(Self {
            data: Mutex::new(DataPlane {
                directory,
                allocator: BlockAllocator::new(config.max_blocks),
            }),
            cursor_lock: Mutex::new(()),
            cursor: Cursor::new(config.seek_mode),
            capacity: AtomicUsize::new(capacity),
        })
    }

    // =========================================================================
    // Positional I/O
    // =========================================================================

    /// Read up to `length` bytes at `offset` into `dst`
    ///
    /// Never crosses a block boundary. Untouched regions read as zeros (the
    /// block is allocated on the way). On success the cursor is left at
    /// `offset + n`, where `n` is the returned count.
    pub fn read<D: TransferSink>(&self, offset: u64, dst: D, length: usize) -> Result<usize> {
        if length == 0 {
            return Ok(0);
        }
        let mut data = self.data.lock();
        self.read_locked(&mut data, offset, dst, length)
    }

    /// Write up to `length` bytes from `src` at `offset`
    ///
    /// Never crosses a block boundary. On success the cursor is left at
    /// `offset + n`, where `n` is the returned count.
    pub fn write<S: TransferSource>(&self, offset: u64, src: S, length: usize) -> Result<usize> {
        if length == 0 {
            return Ok(0);
        }
        let mut data = self.data.lock();
        self.write_locked(&mut data, offset, src, length)
    }

    // =========================================================================
    // Sequential I/O
    // =========================================================================

    /// Read at the cursor position
    pub fn read_next<D: TransferSink>(&self, dst: D, length: usize) -> Result<usize> {
        if length == 0 {
            return Ok(0);
        }
        let mut data = self.data.lock();
        let offset = self.cursor_offset()?;
        self.read_locked(&mut data, offset, dst, length)
    }

    /// Write at the cursor position
    pub fn write_next<S: TransferSource>(&self, src: S, length: usize) -> Result<usize> {
        if length == 0 {
            return Ok(0);
        }
        let mut data = self.data.lock();
        let offset = self.cursor_offset()?;
        self.write_locked(&mut data, offset, src, length)
    }

    // =========================================================================
    // Seek
    // =========================================================================

    /// Move the cursor and return the new position
    pub fn seek(&self, offset: i64, whence: Whence) -> i64 {
        let _guard = self.cursor_lock.lock();
        let capacity = self.capacity.load(Ordering::Acquire);
        let position = self.cursor.seek(offset, whence, capacity);

        tracing::trace!(offset, ?whence, position, "seek");
        position
    }

    /// Seek with a raw whence value
    ///
    /// Unknown values leave the cursor where it is and return its position.
    pub fn seek_raw(&self, offset: i64, whence: i32) -> i64 {
        match Whence::from_raw(whence) {
            Some(whence) => self.seek(offset, whence),
            None => {
                let _guard = self.cursor_lock.lock();
                tracing::debug!(whence, "ignoring unknown whence");
                self.cursor.position()
            }
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Current cursor position
    pub fn position(&self) -> i64 {
        self.cursor.position()
    }

    /// Directory capacity in slots
    pub fn capacity(&self) -> usize {
        self.capacity.load(Ordering::Acquire)
    }

    /// Number of materialized blocks
    pub fn allocated_blocks(&self) -> usize {
        self.data.lock().directory.allocated()
    }

    /// Whether the block at `index` has been materialized
    pub fn is_allocated(&self, index: usize) -> bool {
        self.data.lock().directory.is_present(index)
    }

    /// Snapshot of capacity, allocation and position
    pub fn stats(&self) -> DeviceStats {
        let data = self.data.lock();
        DeviceStats {
            block_size: BLOCK_SIZE as u64,
            capacity: data.directory.capacity() as u64,
            allocated_blocks: data.directory.allocated() as u64,
            position: self.cursor.position(),
        }
    }

    // =========================================================================
    // Private Helpers (called with the data lock held)
    // =========================================================================

    fn read_locked<D: TransferSink>(
        &self,
        data: &mut DataPlane,
        offset: u64,
        mut dst: D,
        length: usize,
    ) -> Result<usize> {
        let (index, within) = locate(offset)?;
        self.materialize(data, index)?;

        let transferable = length.min(BLOCK_SIZE - within);
        let block = data
            .directory
            .block(index)
            .ok_or_else(|| BlkError::Storage(format!("block {} vanished", index)))?;

        let shortfall = dst.copy_out(&block[within..within + transferable]);
        let transferred = transferable - shortfall.min(transferable);
        self.advance(offset, transferred);

        tracing::trace!(offset, requested = length, transferred, "read");
        Ok(transferred)
    }

    fn write_locked<S: TransferSource>(
        &self,
        data: &mut DataPlane,
        offset: u64,
        mut src: S,
        length: usize,
    ) -> Result<usize> {
        let (index, within) = locate(offset)?;
        self.materialize(data, index)?;

        let transferable = length.min(BLOCK_SIZE - within);
        let block = data
            .directory
            .block_mut(index)
            .ok_or_else(|| BlkError::Storage(format!("block {} vanished", index)))?;

        let shortfall = src.copy_in(&mut block[within..within + transferable]);
        let transferred = transferable - shortfall.min(transferable);
        self.advance(offset, transferred);

        tracing::trace!(offset, requested = length, transferred, "write");
        Ok(transferred)
    }

    /// Grow the directory and allocate the block at `index` as needed
    fn materialize(&self, data: &mut DataPlane, index: usize) -> Result<()> {
        let DataPlane {
            directory,
            allocator,
        } = data;

        if let Err(e) = directory.ensure_capacity(index) {
            tracing::warn!(index, error = %e, "directory growth failed");
            return Err(e);
        }
        self.capacity.store(directory.capacity(), Ordering::Release);

        if let Err(e) = allocator.ensure_block(directory, index) {
            tracing::warn!(index, error = %e, "block allocation failed");
            return Err(e);
        }
        Ok(())
    }

    /// Commit the position after a transfer of `transferred` bytes at `offset`
    fn advance(&self, offset: u64, transferred: usize) {
        let start = i64::try_from(offset).unwrap_or(i64::MAX);
        let step = i64::try_from(transferred).unwrap_or(i64::MAX);
        self.cursor.commit(start.saturating_add(step));
    }

    fn cursor_offset(&self) -> Result<u64> {
        let position = self.cursor.position();
        u64::try_from(position).map_err(|_| BlkError::NegativePosition(position))
    }
}

impl Drop for Store {
    fn drop(&mut self) {
        let data = self.data.get_mut();
        tracing::debug!(
            capacity = data.directory.capacity(),
            allocated = data.directory.allocated(),
            "releasing store"
        );
    }
}

/// Split a byte offset into (block index, offset within block)
pub fn locate(offset: u64) -> Result<(usize, usize)> {
    let index = usize::try_from(offset / BLOCK_SIZE as u64).map_err(|_| {
        BlkError::OutOfMemory(format!("offset {} is beyond the addressable range", offset))
    })?;
    let within = (offset % BLOCK_SIZE as u64) as usize;
    Ok((index, within))
}
