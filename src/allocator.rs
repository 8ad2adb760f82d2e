//! Block Allocator
//!
//! Lazily materializes zero-filled blocks on first reference.

use crate::config::BLOCK_SIZE;
use crate::directory::{Block, BlockDirectory};
use crate::error::{BlkError, Result};

/// Materializes blocks into a [`BlockDirectory`]
///
/// Holds an optional budget of blocks; going past it is reported as
/// `OutOfMemory` exactly like a failed heap allocation.
#[derive(Debug, Clone)]
pub struct BlockAllocator {
    max_blocks: Option<usize>,
}

impl BlockAllocator {
    /// Create an allocator with an optional block budget
    pub fn new(max_blocks: Option<usize>) -> Self {
        Self { max_blocks }
    }

    /// Make sure the slot at `index` holds a zeroed block
    ///
    /// `index` must already be within the directory's capacity
    /// (see [`BlockDirectory::ensure_capacity`]). Idempotent: a present slot
    /// is left alone. Returns `true` if a block was allocated.
    pub fn ensure_block(&self, directory: &mut BlockDirectory, index: usize) -> Result<bool> {
        if index >= directory.capacity() {
            return Err(BlkError::Storage(format!(
                "slot {} is beyond directory capacity {}",
                index,
                directory.capacity()
            )));
        }

        if directory.is_present(index) {
            return Ok(false);
        }

        if let Some(limit) = self.max_blocks {
            if directory.allocated() >= limit {
                return Err(BlkError::OutOfMemory(format!(
                    "block budget of {} exhausted",
                    limit
                )));
            }
        }

        let block = allocate_zeroed()?;
        directory.install(index, block)?;

        tracing::trace!(index, "block allocated");
        Ok(true)
    }

    /// Block budget, if any
    pub fn max_blocks(&self) -> Option<usize> {
        self.max_blocks
    }
}

impl Default for BlockAllocator {
    fn default() -> Self {
        Self::new(None)
    }
}

/// Allocate one zero-filled block, reporting heap exhaustion as an error
fn allocate_zeroed() -> Result<Block> {
    let mut buf: Vec<u8> = Vec::new();
    buf.try_reserve_exact(BLOCK_SIZE).map_err(|e| {
        BlkError::OutOfMemory(format!("cannot allocate {}-byte block: {}", BLOCK_SIZE, e))
    })?;
    buf.resize(BLOCK_SIZE, 0);

    buf.into_boxed_slice()
        .try_into()
        .map_err(|_| BlkError::Storage("block buffer has the wrong length".to_string()))
}
