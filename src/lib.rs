//! # sparseblk
//!
//! A sparse, block-addressable in-memory store behind a block-device style
//! read/write/seek interface:
//! - Fixed 4 KiB blocks, allocated and zero-filled on first touch
//! - A growable directory indexing the blocks (doubling or exact-fit)
//! - Single-block transfers: a call never crosses a block boundary
//! - Two coarse locks: one for data, one for the cursor
//! - Optional TCP access through a small binary protocol
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │              TCP Server / DeviceFile handles                 │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                        Store                                 │
//! │        data lock (read/write)   cursor lock (seek)           │
//! └──────────┬──────────────────────────────────┬───────────────┘
//!            │                                  │
//!            ▼                                  ▼
//!   ┌─────────────────┐                ┌─────────────────┐
//!   │ BlockDirectory  │◄───────────────│     Cursor      │
//!   │ + BlockAllocator│   capacity     │  (i64 position) │
//!   └─────────────────┘   (END seek)   └─────────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod directory;
pub mod allocator;
pub mod cursor;
pub mod transfer;
pub mod store;
pub mod device;
pub mod protocol;
pub mod network;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{BlkError, Result};
pub use config::{Config, GrowthPolicy, SeekMode, BLOCK_SIZE, DEFAULT_MAX_CAPACITY};
pub use cursor::{Whence, SEEK_CUR, SEEK_END, SEEK_SET};
pub use device::{Device, DeviceFile};
pub use store::{DeviceStats, Store};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of sparseblk
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
