//! Tests for Device and DeviceFile
//!
//! These tests verify:
//! - Stateless open/close sharing one store
//! - The integer surface: counts, positions and -errno sentinels
//! - Raw whence handling
//! - std::io::Read / std::io::Write adapters at the cursor
//! - Command execution

use std::io::{Read, Write};

use sparseblk::protocol::Command;
use sparseblk::{
    Config, Device, DeviceStats, Whence, BLOCK_SIZE, DEFAULT_MAX_CAPACITY, SEEK_CUR, SEEK_END,
    SEEK_SET,
};

const BS: u64 = BLOCK_SIZE as u64;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_device() -> Device {
    let config = Config::builder().device_name("testdev").build();
    Device::new(&config).unwrap()
}

// =============================================================================
// Lifecycle Tests
// =============================================================================

#[test]
fn test_device_name() {
    let device = setup_device();
    assert_eq!(device.name(), "testdev");
}

#[test]
fn test_invalid_config_rejected() {
    let config = Config::builder().initial_capacity(10).max_capacity(5).build();
    assert!(Device::new(&config).is_err());
}

#[test]
fn test_handles_share_store() {
    let device = setup_device();
    let a = device.open();
    let b = device.open();

    assert_eq!(a.write(5000, &[0xABu8], 1), 1);

    let mut buf = [0u8; 1];
    assert_eq!(b.read(5000, &mut buf, 1), 1);
    assert_eq!(buf[0], 0xAB);

    // One cursor for all handles
    assert_eq!(b.position(), 5001);
    a.close();
    b.close();
}

#[test]
fn test_close_keeps_data() {
    let device = setup_device();
    let file = device.open();
    file.write(10, b"persist", 7);
    file.close();

    let file = device.open();
    let mut buf = [0u8; 7];
    assert_eq!(file.read(10, &mut buf, 7), 7);
    assert_eq!(&buf, b"persist");
}

// =============================================================================
// Integer Surface Tests
// =============================================================================

#[test]
fn test_read_untouched_returns_zero_bytes() {
    let device = setup_device();
    let file = device.open();

    let mut buf = [0xEEu8; 1];
    assert_eq!(file.read(0, &mut buf, 1), 1);
    assert_eq!(buf[0], 0);
}

#[test]
fn test_write_at_block_end_returns_one() {
    let device = setup_device();
    let file = device.open();

    assert_eq!(file.write(BS - 1, &[1u8, 2], 2), 1);
}

#[test]
fn test_out_of_memory_sentinel() {
    let config = Config::builder()
        .initial_capacity(2)
        .max_capacity(2)
        .build();
    let device = Device::new(&config).unwrap();
    let file = device.open();

    let mut buf = [0u8; 1];
    assert_eq!(file.read(2 * BS, &mut buf, 1), -12);
    assert_eq!(file.write(5 * BS, &[1u8], 1), -12);
    assert_eq!(file.position(), 0);
}

#[test]
fn test_raw_seek() {
    let device = setup_device();
    let file = device.open();

    assert_eq!(file.seek(100, SEEK_SET), 100);
    assert_eq!(file.seek(-200, SEEK_CUR), -100);
    assert_eq!(file.seek(0, SEEK_END), (BLOCK_SIZE * BLOCK_SIZE) as i64);
    assert_eq!(file.seek(5, 42), (BLOCK_SIZE * BLOCK_SIZE) as i64);
}

#[test]
fn test_typed_seek() {
    let device = setup_device();
    let file = device.open();

    assert_eq!(file.seek_to(300, Whence::Set), 300);
    assert_eq!(file.seek_to(-50, Whence::Cur), 250);
    assert_eq!(file.seek_to(BS as i64, Whence::End), ((BLOCK_SIZE - 1) * BLOCK_SIZE) as i64);
    assert_eq!(device.store().position(), file.position());
}

#[test]
fn test_default_capacity_cap() {
    let device = setup_device();
    let file = device.open();
    let cap_offset = DEFAULT_MAX_CAPACITY as u64 * BS;

    assert_eq!(Config::default().max_capacity, DEFAULT_MAX_CAPACITY);
    assert_eq!(file.write(cap_offset, &[1u8], 1), -12);
    assert_eq!(file.write(cap_offset + 17, &[1u8], 1), -12);
    assert_eq!(device.store().capacity(), BLOCK_SIZE);
    assert_eq!(device.store().allocated_blocks(), 0);
}

#[test]
fn test_raised_capacity_cap() {
    let config = Config::builder()
        .initial_capacity(1)
        .max_capacity(usize::MAX)
        .growth_policy(sparseblk::GrowthPolicy::ExactFit)
        .build();
    let device = Device::new(&config).unwrap();
    let file = device.open();

    assert_eq!(file.write(9 * BS, &[1u8], 1), 1);
    assert_eq!(device.store().capacity(), 10);
    assert!(device.store().is_allocated(9));
}

// =============================================================================
// std::io Adapter Tests
// =============================================================================

#[test]
fn test_io_write_then_read() {
    let device = setup_device();
    let mut file = device.open();

    file.seek(BS as i64 - 3, SEEK_SET);
    file.write_all(b"hello world").unwrap();
    assert_eq!(file.position(), BS as i64 + 8);

    file.seek(BS as i64 - 3, SEEK_SET);
    let mut buf = [0u8; 11];
    file.read_exact(&mut buf).unwrap();
    assert_eq!(&buf, b"hello world");
}

#[test]
fn test_io_single_call_stops_at_block_end() {
    let device = setup_device();
    let mut file = device.open();

    file.seek(BS as i64 - 2, SEEK_SET);
    let written = Write::write(&mut file, b"abcd").unwrap();
    assert_eq!(written, 2);
}

#[test]
fn test_io_negative_position_is_invalid_input() {
    let device = setup_device();
    let mut file = device.open();

    file.seek(-1, SEEK_SET);
    let mut buf = [0u8; 4];
    let err = Read::read(&mut file, &mut buf).unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::InvalidInput);
}

// =============================================================================
// Command Execution Tests
// =============================================================================

#[test]
fn test_execute_write_read() {
    let device = setup_device();

    let written = device
        .execute(Command::Write {
            offset: 7,
            data: b"data".to_vec(),
        })
        .unwrap()
        .unwrap();
    assert_eq!(written, 4u64.to_be_bytes().to_vec());

    let read = device
        .execute(Command::Read {
            offset: 7,
            length: 4,
        })
        .unwrap()
        .unwrap();
    assert_eq!(read, b"data");
}

#[test]
fn test_execute_read_truncates_at_block_end() {
    let device = setup_device();

    let read = device
        .execute(Command::Read {
            offset: BS - 5,
            length: 1 << 20,
        })
        .unwrap()
        .unwrap();
    assert_eq!(read, vec![0u8; 5]);
}

#[test]
fn test_execute_seek_and_stat() {
    let device = setup_device();

    let position = device
        .execute(Command::Seek {
            offset: -9,
            whence: SEEK_SET as u8,
        })
        .unwrap()
        .unwrap();
    assert_eq!(position, (-9i64).to_be_bytes().to_vec());

    let stat = device.execute(Command::Stat).unwrap().unwrap();
    let stats: DeviceStats = bincode::deserialize(&stat).unwrap();
    assert_eq!(stats.position, -9);
    assert_eq!(stats.capacity, BLOCK_SIZE as u64);
    assert_eq!(stats.allocated_blocks, 0);
}

#[test]
fn test_execute_ping() {
    let device = setup_device();
    assert_eq!(device.execute(Command::Ping).unwrap(), Some(b"PONG".to_vec()));
}
