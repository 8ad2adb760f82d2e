//! Codec Tests
//!
//! Tests for command and response encoding/decoding.

use std::io::Cursor;

use sparseblk::protocol::{
    decode_command, decode_response, encode_command, encode_response, read_command,
    read_response, write_command, write_response, Command, Response, Status, HEADER_SIZE,
    MAX_PAYLOAD_SIZE,
};
use sparseblk::BlkError;

// =============================================================================
// Command Encoding/Decoding Tests
// =============================================================================

#[test]
fn test_encode_decode_read() {
    let cmd = Command::Read {
        offset: 5000,
        length: 512,
    };
    let encoded = encode_command(&cmd).unwrap();

    assert_eq!(encoded.len(), HEADER_SIZE + 12);
    assert_eq!(encoded[0], 0x01);
    assert_eq!(decode_command(&encoded).unwrap(), cmd);
}

#[test]
fn test_encode_decode_write() {
    let cmd = Command::Write {
        offset: u64::MAX,
        data: b"payload".to_vec(),
    };
    let decoded = decode_command(&encode_command(&cmd).unwrap()).unwrap();

    match decoded {
        Command::Write { offset, data } => {
            assert_eq!(offset, u64::MAX);
            assert_eq!(data, b"payload");
        }
        _ => panic!("Expected WRITE command"),
    }
}

#[test]
fn test_encode_decode_write_empty_data() {
    let cmd = Command::Write {
        offset: 3,
        data: Vec::new(),
    };
    assert_eq!(decode_command(&encode_command(&cmd).unwrap()).unwrap(), cmd);
}

#[test]
fn test_encode_decode_negative_seek() {
    let cmd = Command::Seek {
        offset: -4096,
        whence: 2,
    };
    assert_eq!(decode_command(&encode_command(&cmd).unwrap()).unwrap(), cmd);
}

#[test]
fn test_encode_stat_and_ping_have_empty_payload() {
    for cmd in [Command::Stat, Command::Ping] {
        let encoded = encode_command(&cmd).unwrap();
        assert_eq!(encoded.len(), HEADER_SIZE);
        assert_eq!(&encoded[1..5], &[0, 0, 0, 0]);
        assert_eq!(decode_command(&encoded).unwrap(), cmd);
    }
}

#[test]
fn test_wire_layout_is_big_endian() {
    let encoded = encode_command(&Command::Read {
        offset: 0x0102030405060708,
        length: 0x0A0B0C0D,
    }).unwrap();

    assert_eq!(
        encoded,
        vec![
            0x01, 0, 0, 0, 12, 1, 2, 3, 4, 5, 6, 7, 8, 0x0A, 0x0B, 0x0C, 0x0D
        ]
    );
}

// =============================================================================
// Malformed Command Tests
// =============================================================================

#[test]
fn test_decode_incomplete_header() {
    let result = decode_command(&[0x01, 0x00]);
    assert!(matches!(result, Err(BlkError::Protocol(_))));
}

#[test]
fn test_decode_incomplete_payload() {
    let mut encoded = encode_command(&Command::Read {
        offset: 1,
        length: 1,
    }).unwrap();
    encoded.truncate(encoded.len() - 2);

    assert!(matches!(decode_command(&encoded), Err(BlkError::Protocol(_))));
}

#[test]
fn test_decode_unknown_command() {
    let result = decode_command(&[0x7F, 0, 0, 0, 0]);
    assert!(matches!(result, Err(BlkError::Protocol(_))));
}

#[test]
fn test_decode_wrong_read_payload_size() {
    let result = decode_command(&[0x01, 0, 0, 0, 3, 1, 2, 3]);
    assert!(matches!(result, Err(BlkError::Protocol(_))));
}

#[test]
fn test_decode_write_without_offset() {
    let result = decode_command(&[0x02, 0, 0, 0, 2, 1, 2]);
    assert!(matches!(result, Err(BlkError::Protocol(_))));
}

#[test]
fn test_decode_ping_with_payload() {
    let result = decode_command(&[0x05, 0, 0, 0, 1, 9]);
    assert!(matches!(result, Err(BlkError::Protocol(_))));
}

#[test]
fn test_decode_oversized_payload() {
    let mut bytes = vec![0x02];
    bytes.extend_from_slice(&(MAX_PAYLOAD_SIZE + 1).to_be_bytes());

    assert!(matches!(decode_command(&bytes), Err(BlkError::Protocol(_))));
}

#[test]
fn test_encode_rejects_oversized_write() {
    let cmd = Command::Write {
        offset: 0,
        data: vec![0u8; MAX_PAYLOAD_SIZE as usize],
    };

    // 8 offset bytes push the payload one offset past the limit
    assert!(matches!(encode_command(&cmd), Err(BlkError::Protocol(_))));
}

#[test]
fn test_write_command_sends_nothing_when_oversized() {
    let mut wire = Vec::new();
    let cmd = Command::Write {
        offset: 0,
        data: vec![0u8; MAX_PAYLOAD_SIZE as usize + 1],
    };

    assert!(matches!(write_command(&mut wire, &cmd), Err(BlkError::Protocol(_))));
    assert!(wire.is_empty());
}

#[test]
fn test_encode_accepts_payload_at_limit() {
    let cmd = Command::Write {
        offset: 0,
        data: vec![7u8; MAX_PAYLOAD_SIZE as usize - 8],
    };
    let encoded = encode_command(&cmd).unwrap();

    assert_eq!(encoded.len(), HEADER_SIZE + MAX_PAYLOAD_SIZE as usize);
    assert_eq!(decode_command(&encoded).unwrap(), cmd);
}

// =============================================================================
// Response Tests
// =============================================================================

#[test]
fn test_encode_decode_ok_response() {
    let response = Response::ok(Some(vec![1, 2, 3]));
    let decoded = decode_response(&encode_response(&response).unwrap()).unwrap();

    assert_eq!(decoded.status, Status::Ok);
    assert_eq!(decoded.payload, Some(vec![1, 2, 3]));
}

#[test]
fn test_empty_payload_decodes_as_none() {
    let decoded = decode_response(&encode_response(&Response::ok(None)).unwrap()).unwrap();
    assert_eq!(decoded.payload, None);
}

#[test]
fn test_out_of_memory_response() {
    let err = BlkError::OutOfMemory("budget exhausted".to_string());
    let response = Response::from_error(&err);
    let decoded = decode_response(&encode_response(&response).unwrap()).unwrap();

    assert_eq!(decoded.status, Status::OutOfMemory);
    assert!(decoded.message().contains("budget exhausted"));
}

#[test]
fn test_error_response() {
    let err = BlkError::Protocol("bad frame".to_string());
    let decoded = decode_response(&encode_response(&Response::from_error(&err)).unwrap()).unwrap();

    assert_eq!(decoded.status, Status::Error);
    assert!(decoded.message().contains("bad frame"));
}

#[test]
fn test_decode_unknown_status() {
    let result = decode_response(&[0x09, 0, 0, 0, 0]);
    assert!(matches!(result, Err(BlkError::Protocol(_))));
}

// =============================================================================
// Stream I/O Tests
// =============================================================================

#[test]
fn test_stream_commands_back_to_back() {
    let mut wire = Vec::new();
    write_command(&mut wire, &Command::Ping).unwrap();
    write_command(
        &mut wire,
        &Command::Write {
            offset: 9,
            data: b"xy".to_vec(),
        },
    )
    .unwrap();

    let mut reader = Cursor::new(wire);
    assert_eq!(read_command(&mut reader).unwrap(), Command::Ping);
    assert_eq!(
        read_command(&mut reader).unwrap(),
        Command::Write {
            offset: 9,
            data: b"xy".to_vec()
        }
    );

    // Stream exhausted
    match read_command(&mut reader) {
        Err(BlkError::Io(e)) => assert_eq!(e.kind(), std::io::ErrorKind::UnexpectedEof),
        other => panic!("Expected EOF, got {:?}", other),
    }
}

#[test]
fn test_stream_response() {
    let mut wire = Vec::new();
    write_response(&mut wire, &Response::ok(Some(b"PONG".to_vec()))).unwrap();

    let response = read_response(&mut Cursor::new(wire)).unwrap();
    assert_eq!(response, Response::ok(Some(b"PONG".to_vec())));
}
