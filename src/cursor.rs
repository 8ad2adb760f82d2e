//! Cursor
//!
//! Tracks the current byte position and implements the three seek modes.
//!
//! The position is a signed value that is not bounded by the directory
//! capacity. In the default mode nothing is clamped, so relative and
//! end-relative seeks can leave it negative.
//!
//! END-relative seeks measure from `capacity * BLOCK_SIZE`, the end of the
//! allocated address space, and subtract the offset rather than adding it.
//! This is not the highest byte ever written and does not follow
//! `lseek(2)`'s sign convention for `SEEK_END`.

use std::sync::atomic::{AtomicI64, Ordering};

use crate::config::{SeekMode, BLOCK_SIZE};

/// Raw whence value for absolute seeks
pub const SEEK_SET: i32 = 0;

/// Raw whence value for seeks relative to the current position
pub const SEEK_CUR: i32 = 1;

/// Raw whence value for seeks relative to the end of the address space
pub const SEEK_END: i32 = 2;

/// Seek origin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Whence {
    /// position = offset
    Set = 0,

    /// position = position + offset
    Cur = 1,

    /// position = capacity * BLOCK_SIZE - offset
    End = 2,
}

impl Whence {
    /// Decode a raw whence value; unknown values yield `None`
    pub fn from_raw(raw: i32) -> Option<Self> {
        match raw {
            SEEK_SET => Some(Whence::Set),
            SEEK_CUR => Some(Whence::Cur),
            SEEK_END => Some(Whence::End),
            _ => None,
        }
    }
}

/// Current byte position of a store
///
/// The cursor does no locking of its own. The store commits positions from
/// read/write while holding its data lock and from seek while holding its
/// cursor lock; the atomic keeps the two paths from tearing each other.
#[derive(Debug)]
pub struct Cursor {
    position: AtomicI64,
    mode: SeekMode,
}

impl Cursor {
    /// Create a cursor at position 0
    pub fn new(mode: SeekMode) -> Self {
        Self {
            position: AtomicI64::new(0),
            mode,
        }
    }

    /// Current position
    pub fn position(&self) -> i64 {
        self.position.load(Ordering::Acquire)
    }

    /// Clamping mode
    pub fn mode(&self) -> SeekMode {
        self.mode
    }

    /// Store a position computed by a completed transfer
    pub(crate) fn commit(&self, position: i64) {
        self.position.store(self.apply_mode(position), Ordering::Release);
    }

    /// Move the cursor and return the new position
    ///
    /// `capacity` is the directory capacity in slots, used by `End`.
    pub fn seek(&self, offset: i64, whence: Whence, capacity: usize) -> i64 {
        let next = self.apply_mode(resolve(self.position(), offset, whence, capacity));
        self.position.store(next, Ordering::Release);
        next
    }

    fn apply_mode(&self, position: i64) -> i64 {
        match self.mode {
            SeekMode::Unclamped => position,
            SeekMode::ClampToZero => position.max(0),
        }
    }
}

impl Default for Cursor {
    fn default() -> Self {
        Self::new(SeekMode::Unclamped)
    }
}

/// Compute a seek target without touching any state
///
/// Arithmetic saturates at the `i64` bounds.
pub fn resolve(current: i64, offset: i64, whence: Whence, capacity: usize) -> i64 {
    match whence {
        Whence::Set => offset,
        Whence::Cur => current.saturating_add(offset),
        Whence::End => {
            let slots = i64::try_from(capacity).unwrap_or(i64::MAX);
            slots
                .saturating_mul(BLOCK_SIZE as i64)
                .saturating_sub(offset)
        }
    }
}
