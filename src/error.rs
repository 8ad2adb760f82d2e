//! Error types for sparseblk
//!
//! Provides a unified error type for all operations, plus the mapping onto
//! the negative errno sentinels used by the integer file-operation surface.

use thiserror::Error;

/// Result type alias using BlkError
pub type Result<T> = std::result::Result<T, BlkError>;

/// errno for allocation failures
pub const ENOMEM: i64 = 12;

/// errno for invalid arguments
pub const EINVAL: i64 = 22;

/// errno for everything that is neither of the above
pub const EIO: i64 = 5;

/// Unified error type for sparseblk operations
#[derive(Debug, Error)]
pub enum BlkError {
    // -------------------------------------------------------------------------
    // Storage Errors
    // -------------------------------------------------------------------------
    /// Directory growth or block allocation could not be satisfied
    #[error("Out of memory: {0}")]
    OutOfMemory(String),

    /// Sequential access attempted while the cursor sits before byte 0
    #[error("Cursor position {0} is negative")]
    NegativePosition(i64),

    #[error("Storage error: {0}")]
    Storage(String),

    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Serialization Errors
    // -------------------------------------------------------------------------
    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Network Errors
    // -------------------------------------------------------------------------
    #[error("Network error: {0}")]
    Network(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl BlkError {
    /// Negative errno sentinel for this error
    pub fn errno(&self) -> i64 {
        match self {
            BlkError::OutOfMemory(_) => -ENOMEM,
            BlkError::NegativePosition(_) | BlkError::Config(_) => -EINVAL,
            _ => -EIO,
        }
    }

    /// True for allocation failures
    pub fn is_out_of_memory(&self) -> bool {
        matches!(self, BlkError::OutOfMemory(_))
    }
}

impl From<bincode::Error> for BlkError {
    fn from(e: bincode::Error) -> Self {
        BlkError::Serialization(e.to_string())
    }
}
