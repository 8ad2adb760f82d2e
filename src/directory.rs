//! Block Directory
//!
//! Growable indexed collection of optional block-owning slots.
//!
//! ## Responsibilities
//! - Map a block index to an owned, fixed-size block (or nothing yet)
//! - Grow on demand without disturbing existing blocks
//! - Fail growth cleanly: a failed resize leaves the directory untouched
//!
//! ## Layout
//! ```text
//!   index:   0      1      2      3     ...   C-1
//!          ┌──────┬──────┬──────┬──────┬─────┬──────┐
//!          │ None │ Some │ None │ Some │ ... │ None │
//!          └──────┴──┬───┴──────┴──┬───┴─────┴──────┘
//!                    ▼             ▼
//!               [u8; 4096]    [u8; 4096]
//! ```
//!
//! Growing reallocates the slot vector only. The boxed blocks the slots point
//! at never move, and every new slot starts out empty.

use crate::config::{GrowthPolicy, BLOCK_SIZE};
use crate::error::{BlkError, Result};

/// One materialized block. The array type pins the length to BLOCK_SIZE.
pub type Block = Box<[u8; BLOCK_SIZE]>;

/// Growable directory of optional blocks
///
/// Capacity (`C`) is the number of slots and never decreases.
#[derive(Debug)]
pub struct BlockDirectory {
    /// One entry per slot; `len()` is the capacity
    slots: Vec<Option<Block>>,

    /// Growth policy applied when an index lands past the end
    policy: GrowthPolicy,

    /// Largest capacity growth may reach
    max_capacity: usize,

    /// Number of present slots
    allocated: usize,
}

impl BlockDirectory {
    /// Create a directory with `initial_capacity` empty slots
    pub fn new(initial_capacity: usize, policy: GrowthPolicy, max_capacity: usize) -> Result<Self> {
        if initial_capacity > max_capacity {
            return Err(BlkError::OutOfMemory(format!(
                "initial capacity {} exceeds limit of {} slots",
                initial_capacity, max_capacity
            )));
        }

        let mut slots = Vec::new();
        slots.try_reserve_exact(initial_capacity).map_err(|e| {
            BlkError::OutOfMemory(format!(
                "cannot allocate directory of {} slots: {}",
                initial_capacity, e
            ))
        })?;
        slots.resize_with(initial_capacity, || None);

        Ok(Self {
            slots,
            policy,
            max_capacity,
            allocated: 0,
        })
    }

    /// Make sure `index` addresses a slot, growing if necessary
    ///
    /// Returns `true` if the directory grew. On error the directory is
    /// exactly as it was before the call.
    pub fn ensure_capacity(&mut self, index: usize) -> Result<bool> {
        let capacity = self.slots.len();
        if index < capacity {
            return Ok(false);
        }

        let required = index.checked_add(1).ok_or_else(|| {
            BlkError::OutOfMemory(format!("block index {} is not addressable", index))
        })?;

        if required > self.max_capacity {
            return Err(BlkError::OutOfMemory(format!(
                "block index {} exceeds directory limit of {} slots",
                index, self.max_capacity
            )));
        }

        let target = match self.policy {
            GrowthPolicy::Doubling => capacity
                .saturating_mul(2)
                .max(required)
                .min(self.max_capacity),
            GrowthPolicy::ExactFit => required,
        };

        // try_reserve leaves the vector untouched when it fails
        self.slots
            .try_reserve_exact(target - capacity)
            .map_err(|e| {
                BlkError::OutOfMemory(format!(
                    "cannot grow directory from {} to {} slots: {}",
                    capacity, target, e
                ))
            })?;
        self.slots.resize_with(target, || None);

        tracing::debug!(from = capacity, to = target, "directory grew");
        Ok(true)
    }

    /// Install a freshly allocated block into an empty slot
    ///
    /// Present slots are never replaced; the new block is dropped instead.
    pub(crate) fn install(&mut self, index: usize, block: Block) -> Result<()> {
        let capacity = self.slots.len();
        let slot = self.slots.get_mut(index).ok_or_else(|| {
            BlkError::Storage(format!(
                "slot {} is beyond directory capacity {}",
                index, capacity
            ))
        })?;

        if slot.is_none() {
            *slot = Some(block);
            self.allocated += 1;
        }
        Ok(())
    }

    /// Number of slots (C)
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of slots holding a block
    pub fn allocated(&self) -> usize {
        self.allocated
    }

    /// Largest capacity this directory may grow to
    pub fn max_capacity(&self) -> usize {
        self.max_capacity
    }

    /// Whether `index` holds a block
    pub fn is_present(&self, index: usize) -> bool {
        matches!(self.slots.get(index), Some(Some(_)))
    }

    /// Borrow the block at `index`, if present
    pub fn block(&self, index: usize) -> Option<&[u8; BLOCK_SIZE]> {
        self.slots.get(index)?.as_deref()
    }

    /// Mutably borrow the block at `index`, if present
    pub fn block_mut(&mut self, index: usize) -> Option<&mut [u8; BLOCK_SIZE]> {
        self.slots.get_mut(index)?.as_deref_mut()
    }
}
