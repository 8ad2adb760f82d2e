//! Command definitions
//!
//! Represents commands from clients.

/// Command types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CommandType {
    Read = 0x01,
    Write = 0x02,
    Seek = 0x03,
    Stat = 0x04,
    Ping = 0x05,
}

/// A parsed command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Read up to `length` bytes at `offset` (never past the block end)
    Read { offset: u64, length: u32 },

    /// Write `data` at `offset` (truncated at the block end)
    Write { offset: u64, data: Vec<u8> },

    /// Move the shared cursor; `whence` is the raw SEEK_* value
    Seek { offset: i64, whence: u8 },

    /// Capacity / allocation / position snapshot
    Stat,

    /// Ping (health check)
    Ping,
}

impl Command {
    /// Get the command type
    pub fn command_type(&self) -> CommandType {
        match self {
            Command::Read { .. } => CommandType::Read,
            Command::Write { .. } => CommandType::Write,
            Command::Seek { .. } => CommandType::Seek,
            Command::Stat => CommandType::Stat,
            Command::Ping => CommandType::Ping,
        }
    }
}
