//! Configuration for sparseblk
//!
//! Centralized configuration with sensible defaults.

use crate::error::{BlkError, Result};

/// Size of every block in bytes
pub const BLOCK_SIZE: usize = 4096;

/// Default directory slot limit: 64 GiB of byte address space
///
/// This is a quota, not an allocation check. An offset at or past
/// `DEFAULT_MAX_CAPACITY * BLOCK_SIZE` fails with `OutOfMemory` even when the
/// host could grow the directory. Raise `max_capacity` (up to `usize::MAX`)
/// to leave only the allocator in charge.
pub const DEFAULT_MAX_CAPACITY: usize = 1 << 24;

/// Main configuration for a store instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Directory Configuration
    // -------------------------------------------------------------------------
    /// Number of slots the directory starts with (C0)
    pub initial_capacity: usize,

    /// How the directory grows when an access lands past its end
    pub growth_policy: GrowthPolicy,

    /// Hard upper bound on directory slots; growth past it is OutOfMemory
    ///
    /// Defaults to [`DEFAULT_MAX_CAPACITY`], a deliberate cap on how far a
    /// single access can stretch the directory.
    pub max_capacity: usize,

    // -------------------------------------------------------------------------
    // Allocator Configuration
    // -------------------------------------------------------------------------
    /// Optional budget of materialized blocks (None = limited only by the heap)
    pub max_blocks: Option<usize>,

    // -------------------------------------------------------------------------
    // Cursor Configuration
    // -------------------------------------------------------------------------
    /// Whether seeks may leave the cursor negative
    pub seek_mode: SeekMode,

    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// Name the device is published under (logging and STAT)
    pub device_name: String,

    /// TCP listen address
    pub listen_addr: String,

    /// Worker threads serving connections, one session each
    pub worker_threads: usize,

    /// Max concurrent client connections (further capped by `worker_threads`)
    pub max_connections: usize,

    /// Connection read timeout (milliseconds, 0 = none)
    pub read_timeout_ms: u64,

    /// Connection write timeout (milliseconds, 0 = none)
    pub write_timeout_ms: u64,
}

/// Directory growth policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrowthPolicy {
    /// C' = max(2 * C, index + 1). Amortized O(1) for sequential growth.
    Doubling,

    /// C' = index + 1. No over-allocation, O(n) copy per new maximum.
    ExactFit,
}

/// Cursor clamping behaviour
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekMode {
    /// Positions are stored exactly as computed, negative included
    Unclamped,

    /// Negative positions are raised to 0
    ClampToZero,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            initial_capacity: BLOCK_SIZE,
            growth_policy: GrowthPolicy::Doubling,
            max_capacity: DEFAULT_MAX_CAPACITY,
            max_blocks: None,
            seek_mode: SeekMode::Unclamped,
            device_name: "scull".to_string(),
            listen_addr: "127.0.0.1:7070".to_string(),
            worker_threads: 4,
            max_connections: 64,
            read_timeout_ms: 0,
            write_timeout_ms: 5000,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Check cross-field constraints
    pub fn validate(&self) -> Result<()> {
        if self.initial_capacity > self.max_capacity {
            return Err(BlkError::Config(format!(
                "initial capacity {} exceeds max capacity {}",
                self.initial_capacity, self.max_capacity
            )));
        }
        if self.worker_threads == 0 {
            return Err(BlkError::Config("worker_threads must be at least 1".to_string()));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the initial number of directory slots
    pub fn initial_capacity(mut self, slots: usize) -> Self {
        self.config.initial_capacity = slots;
        self
    }

    /// Set the directory growth policy
    pub fn growth_policy(mut self, policy: GrowthPolicy) -> Self {
        self.config.growth_policy = policy;
        self
    }

    /// Set the maximum number of directory slots
    pub fn max_capacity(mut self, slots: usize) -> Self {
        self.config.max_capacity = slots;
        self
    }

    /// Set the block allocation budget
    pub fn max_blocks(mut self, blocks: Option<usize>) -> Self {
        self.config.max_blocks = blocks;
        self
    }

    /// Set the seek clamping mode
    pub fn seek_mode(mut self, mode: SeekMode) -> Self {
        self.config.seek_mode = mode;
        self
    }

    /// Set the device name
    pub fn device_name(mut self, name: impl Into<String>) -> Self {
        self.config.device_name = name.into();
        self
    }

    /// Set the TCP listen address
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    /// Set the number of connection worker threads
    pub fn worker_threads(mut self, count: usize) -> Self {
        self.config.worker_threads = count;
        self
    }

    /// Set the maximum number of concurrent connections
    pub fn max_connections(mut self, count: usize) -> Self {
        self.config.max_connections = count;
        self
    }

    /// Set the read timeout (in milliseconds)
    pub fn read_timeout_ms(mut self, ms: u64) -> Self {
        self.config.read_timeout_ms = ms;
        self
    }

    /// Set the write timeout (in milliseconds)
    pub fn write_timeout_ms(mut self, ms: u64) -> Self {
        self.config.write_timeout_ms = ms;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
