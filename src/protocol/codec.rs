//! Protocol codec
//!
//! Encoding and decoding functions for the wire protocol.
//!
//! ## Wire Format
//!
//! ### Request (Command) Format
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │ Cmd (1)  │ Len (4)  │         Payload             │
//! └──────────┴──────────┴─────────────────────────────┘
//! ```
//!
//! ### Payload by Command Type
//! - READ:  offset (8) + length (4)
//! - WRITE: offset (8) + data
//! - SEEK:  offset (8, signed) + whence (1)
//! - STAT:  empty
//! - PING:  empty
//!
//! ### Response Format
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │Status(1) │ Len (4)  │         Payload             │
//! └──────────┴──────────┴─────────────────────────────┘
//! ```

use std::io::{Read, Write};

use bytes::{Buf, BufMut, BytesMut};

use crate::error::{BlkError, Result};
use super::{Command, Response, Status};

/// Header size: 1 byte command/status + 4 bytes length
pub const HEADER_SIZE: usize = 5;

/// Maximum payload size (16 MB)
pub const MAX_PAYLOAD_SIZE: u32 = 16 * 1024 * 1024;

const READ_PAYLOAD_SIZE: usize = 8 + 4;
const SEEK_PAYLOAD_SIZE: usize = 8 + 1;

// =============================================================================
// Command Encoding/Decoding
// =============================================================================

/// Encode a command to bytes
///
/// Format: cmd_type (1) + payload_len (4) + payload
///
/// Fails with `Protocol` if the payload exceeds [`MAX_PAYLOAD_SIZE`].
pub fn encode_command(command: &Command) -> Result<Vec<u8>> {
    let cmd_type = command.command_type() as u8;

    // Build payload based on command type
    let mut payload = BytesMut::new();
    match command {
        Command::Read { offset, length } => {
            payload.put_u64(*offset);
            payload.put_u32(*length);
        }
        Command::Write { offset, data } => {
            payload.reserve(8 + data.len());
            payload.put_u64(*offset);
            payload.put_slice(data);
        }
        Command::Seek { offset, whence } => {
            payload.put_i64(*offset);
            payload.put_u8(*whence);
        }
        Command::Stat | Command::Ping => {}
    }

    frame(cmd_type, &payload)
}

/// Decode a command from bytes
pub fn decode_command(bytes: &[u8]) -> Result<Command> {
    let (cmd_type, mut payload) = split_frame(bytes, "command")?;

    // Parse command based on type
    match cmd_type {
        0x01 => {
            expect_len(payload, READ_PAYLOAD_SIZE, "READ")?;
            let offset = payload.get_u64();
            let length = payload.get_u32();
            Ok(Command::Read { offset, length })
        }
        0x02 => {
            if payload.len() < 8 {
                return Err(BlkError::Protocol(
                    "WRITE command: missing offset".to_string(),
                ));
            }
            let offset = payload.get_u64();
            Ok(Command::Write {
                offset,
                data: payload.to_vec(),
            })
        }
        0x03 => {
            expect_len(payload, SEEK_PAYLOAD_SIZE, "SEEK")?;
            let offset = payload.get_i64();
            let whence = payload.get_u8();
            Ok(Command::Seek { offset, whence })
        }
        0x04 => {
            expect_len(payload, 0, "STAT")?;
            Ok(Command::Stat)
        }
        0x05 => {
            expect_len(payload, 0, "PING")?;
            Ok(Command::Ping)
        }
        _ => Err(BlkError::Protocol(format!(
            "Unknown command type: 0x{:02x}",
            cmd_type
        ))),
    }
}

// =============================================================================
// Response Encoding/Decoding
// =============================================================================

/// Encode a response to bytes
///
/// Format: status (1) + payload_len (4) + payload
pub fn encode_response(response: &Response) -> Result<Vec<u8>> {
    let payload = response.payload.as_deref().unwrap_or(&[]);
    frame(response.status as u8, payload)
}

/// Decode a response from bytes
pub fn decode_response(bytes: &[u8]) -> Result<Response> {
    let (status_byte, payload) = split_frame(bytes, "response")?;

    // Parse status
    let status = match status_byte {
        0x00 => Status::Ok,
        0x01 => Status::OutOfMemory,
        0x02 => Status::Error,
        _ => {
            return Err(BlkError::Protocol(format!(
                "Unknown response status: 0x{:02x}",
                status_byte
            )))
        }
    };

    // Extract payload
    let payload = if payload.is_empty() {
        None
    } else {
        Some(payload.to_vec())
    };

    Ok(Response { status, payload })
}

// =============================================================================
// Stream-based I/O helpers
// =============================================================================

/// Read a complete command from a stream
///
/// Blocks until a complete command is received or an error occurs
pub fn read_command<R: Read>(reader: &mut R) -> Result<Command> {
    let message = read_frame(reader, "command")?;
    decode_command(&message)
}

/// Write a command to a stream
pub fn write_command<W: Write>(writer: &mut W, command: &Command) -> Result<()> {
    let bytes = encode_command(command)?;
    writer.write_all(&bytes)?;
    writer.flush()?;
    Ok(())
}

/// Read a complete response from a stream
pub fn read_response<R: Read>(reader: &mut R) -> Result<Response> {
    let message = read_frame(reader, "response")?;
    decode_response(&message)
}

/// Write a response to a stream
pub fn write_response<W: Write>(writer: &mut W, response: &Response) -> Result<()> {
    let bytes = encode_response(response)?;
    writer.write_all(&bytes)?;
    writer.flush()?;
    Ok(())
}

// =============================================================================
// Framing helpers
// =============================================================================

/// Build header + payload
fn frame(tag: u8, payload: &[u8]) -> Result<Vec<u8>> {
    let payload_len = u32::try_from(payload.len()).map_err(|_| {
        BlkError::Protocol(format!(
            "payload too large: {} bytes (max {})",
            payload.len(),
            MAX_PAYLOAD_SIZE
        ))
    })?;
    check_payload_len(payload_len, "outgoing")?;

    let mut message = BytesMut::with_capacity(HEADER_SIZE + payload.len());
    message.put_u8(tag);
    message.put_u32(payload_len);
    message.put_slice(payload);
    Ok(message.to_vec())
}

/// Validate a complete message and split it into (tag, payload)
fn split_frame<'a>(bytes: &'a [u8], kind: &str) -> Result<(u8, &'a [u8])> {
    if bytes.len() < HEADER_SIZE {
        return Err(BlkError::Protocol(format!(
            "Incomplete {} header: expected {} bytes, got {}",
            kind,
            HEADER_SIZE,
            bytes.len()
        )));
    }

    let mut header = &bytes[..HEADER_SIZE];
    let tag = header.get_u8();
    let payload_len = header.get_u32();
    check_payload_len(payload_len, kind)?;

    let total_len = HEADER_SIZE + payload_len as usize;
    if bytes.len() < total_len {
        return Err(BlkError::Protocol(format!(
            "Incomplete {} payload: expected {} bytes, got {}",
            kind,
            total_len,
            bytes.len()
        )));
    }

    Ok((tag, &bytes[HEADER_SIZE..total_len]))
}

/// Read header, then exactly the announced payload
fn read_frame<R: Read>(reader: &mut R, kind: &str) -> Result<Vec<u8>> {
    let mut header = [0u8; HEADER_SIZE];
    reader.read_exact(&mut header)?;

    let payload_len = (&header[1..]).get_u32();
    check_payload_len(payload_len, kind)?;

    let mut message = vec![0u8; HEADER_SIZE + payload_len as usize];
    message[..HEADER_SIZE].copy_from_slice(&header);
    if payload_len > 0 {
        reader.read_exact(&mut message[HEADER_SIZE..])?;
    }
    Ok(message)
}

fn check_payload_len(payload_len: u32, kind: &str) -> Result<()> {
    if payload_len > MAX_PAYLOAD_SIZE {
        return Err(BlkError::Protocol(format!(
            "{} payload too large: {} bytes (max {})",
            kind, payload_len, MAX_PAYLOAD_SIZE
        )));
    }
    Ok(())
}

fn expect_len(payload: &[u8], expected: usize, command: &str) -> Result<()> {
    if payload.len() != expected {
        return Err(BlkError::Protocol(format!(
            "{} command: expected {} payload bytes, got {}",
            command,
            expected,
            payload.len()
        )));
    }
    Ok(())
}
