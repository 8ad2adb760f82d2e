//! Response definitions
//!
//! Represents responses to clients.

use crate::error::BlkError;

/// Response status codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Status {
    Ok = 0x00,
    OutOfMemory = 0x01,
    Error = 0x02,
}

/// A response to send to client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Status code
    pub status: Status,

    /// Optional payload (command result for OK, message otherwise)
    pub payload: Option<Vec<u8>>,
}

impl Response {
    /// Create an OK response with optional payload
    pub fn ok(payload: Option<Vec<u8>>) -> Self {
        Self {
            status: Status::Ok,
            payload,
        }
    }

    /// Create an OUT_OF_MEMORY response
    pub fn out_of_memory(message: &str) -> Self {
        Self {
            status: Status::OutOfMemory,
            payload: Some(message.as_bytes().to_vec()),
        }
    }

    /// Create an ERROR response
    pub fn error(message: &str) -> Self {
        Self {
            status: Status::Error,
            payload: Some(message.as_bytes().to_vec()),
        }
    }

    /// Map an error onto the matching status
    pub fn from_error(error: &BlkError) -> Self {
        match error {
            BlkError::OutOfMemory(_) => Self::out_of_memory(&error.to_string()),
            _ => Self::error(&error.to_string()),
        }
    }

    /// Payload as text (for error messages)
    pub fn message(&self) -> String {
        self.payload
            .as_deref()
            .map(|p| String::from_utf8_lossy(p).into_owned())
            .unwrap_or_default()
    }
}
