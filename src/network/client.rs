//! TCP Client
//!
//! Blocking client for a sparseblk server.

use std::io::{BufReader, BufWriter};
use std::net::{TcpStream, ToSocketAddrs};

use crate::error::{BlkError, Result};
use crate::protocol::{read_response, write_command, Command, Response, Status};
use crate::store::DeviceStats;

/// Blocking client speaking the sparseblk protocol
pub struct Client {
    reader: BufReader<TcpStream>,
    writer: BufWriter<TcpStream>,
}

impl Client {
    /// Connect to a server
    pub fn connect<A: ToSocketAddrs>(addr: A) -> Result<Self> {
        let stream = TcpStream::connect(addr)
            .map_err(|e| BlkError::Network(format!("connect failed: {}", e)))?;
        stream.set_nodelay(true)?;
        let read_half = stream.try_clone()?;

        Ok(Self {
            reader: BufReader::new(read_half),
            writer: BufWriter::new(stream),
        })
    }

    /// Read up to `length` bytes at `offset`; stops at the block end
    pub fn read(&mut self, offset: u64, length: u32) -> Result<Vec<u8>> {
        let payload = self.call(Command::Read { offset, length })?;
        Ok(payload.unwrap_or_default())
    }

    /// Write `data` at `offset`; returns bytes accepted
    pub fn write(&mut self, offset: u64, data: &[u8]) -> Result<u64> {
        let payload = self.call(Command::Write {
            offset,
            data: data.to_vec(),
        })?;
        Ok(u64::from_be_bytes(fixed(payload, "WRITE")?))
    }

    /// Seek the server-side cursor; returns the new position
    pub fn seek(&mut self, offset: i64, whence: u8) -> Result<i64> {
        let payload = self.call(Command::Seek { offset, whence })?;
        Ok(i64::from_be_bytes(fixed(payload, "SEEK")?))
    }

    /// Fetch a stats snapshot
    pub fn stat(&mut self) -> Result<DeviceStats> {
        let payload = self.call(Command::Stat)?.unwrap_or_default();
        Ok(bincode::deserialize(&payload)?)
    }

    /// Health check
    pub fn ping(&mut self) -> Result<()> {
        match self.call(Command::Ping)? {
            Some(ref p) if p.as_slice() == b"PONG" => Ok(()),
            other => Err(BlkError::Protocol(format!("unexpected PING reply: {:?}", other))),
        }
    }

    /// Send one command and wait for its response
    fn call(&mut self, command: Command) -> Result<Option<Vec<u8>>> {
        write_command(&mut self.writer, &command)?;
        let response = read_response(&mut self.reader)?;
        into_result(response)
    }
}

fn into_result(response: Response) -> Result<Option<Vec<u8>>> {
    match response.status {
        Status::Ok => Ok(response.payload),
        Status::OutOfMemory => Err(BlkError::OutOfMemory(response.message())),
        Status::Error => Err(BlkError::Network(format!("server error: {}", response.message()))),
    }
}

fn fixed(payload: Option<Vec<u8>>, command: &str) -> Result<[u8; 8]> {
    let payload = payload.unwrap_or_default();
    payload.as_slice().try_into().map_err(|_| {
        BlkError::Protocol(format!(
            "{} reply: expected 8 bytes, got {}",
            command,
            payload.len()
        ))
    })
}
