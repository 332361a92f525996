//! Tests for the shuffled record reader
//!
//! These tests verify:
//! - Output is a permutation of the input
//! - Passthrough when capacity is 0
//! - Deterministic order for a fixed seed
//! - Fill behavior before the first record is returned
//! - Upstream errors are surfaced, not masked

use std::collections::HashSet;
use std::io::Cursor;
use std::path::PathBuf;

use bytes::Bytes;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tfrecord_fast::{Config, RecordReader, RecordSource, RecordWriter, ShuffleReader, TfRecordError};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn encode_numbered(count: u32) -> Vec<u8> {
    let mut writer = RecordWriter::new(Vec::new(), 4096).unwrap();
    for i in 0..count {
        writer.write(&i.to_le_bytes()).unwrap();
    }
    writer.into_inner().unwrap()
}

fn decode_number(record: &Bytes) -> u32 {
    u32::from_le_bytes([record[0], record[1], record[2], record[3]])
}

fn shuffled_order(count: u32, capacity: usize, seed: u64) -> Vec<u32> {
    let reader = RecordReader::new(Cursor::new(encode_numbered(count)), true);
    ShuffleReader::with_seed(reader, capacity, seed)
        .records()
        .map(|r| decode_number(&r.unwrap()))
        .collect()
}

// =============================================================================
// Permutation
// =============================================================================

#[test]
fn test_output_is_permutation() {
    for capacity in [1usize, 2, 4, 16, 99, 100, 1000] {
        let mut order = shuffled_order(100, capacity, 7);
        assert_eq!(order.len(), 100, "capacity {}", capacity);
        order.sort_unstable();
        assert_eq!(order, (0..100).collect::<Vec<_>>(), "capacity {}", capacity);
    }
}

#[test]
fn test_capacity_zero_is_passthrough() {
    let order = shuffled_order(50, 0, 7);
    assert_eq!(order, (0..50).collect::<Vec<_>>());
}

#[test]
fn test_capacity_one_preserves_order() {
    let order = shuffled_order(50, 1, 12345);
    assert_eq!(order, (0..50).collect::<Vec<_>>());
}

#[test]
fn test_large_pool_actually_shuffles() {
    let order = shuffled_order(200, 200, 99);
    assert_ne!(order, (0..200).collect::<Vec<_>>());
}

#[test]
fn test_empty_stream() {
    let reader = RecordReader::new(Cursor::new(Vec::new()), true);
    let mut shuffle = ShuffleReader::with_seed(reader, 8, 1);

    assert!(shuffle.read_next().unwrap().is_none());
    assert!(shuffle.read_next().unwrap().is_none());
}

// =============================================================================
// Determinism
// =============================================================================

#[test]
fn test_same_seed_same_order() {
    assert_eq!(shuffled_order(300, 32, 2024), shuffled_order(300, 32, 2024));
}

#[test]
fn test_different_seeds_differ() {
    assert_ne!(shuffled_order(300, 64, 1), shuffled_order(300, 64, 2));
}

#[test]
fn test_custom_rng() {
    let reader = RecordReader::new(Cursor::new(encode_numbered(20)), true);
    let shuffle = ShuffleReader::with_rng(reader, 5, StdRng::seed_from_u64(3));

    let mut order: Vec<u32> = shuffle.records().map(|r| decode_number(&r.unwrap())).collect();
    order.sort_unstable();
    assert_eq!(order, (0..20).collect::<Vec<_>>());
}

// =============================================================================
// Fill Behavior
// =============================================================================

#[test]
fn test_pool_filled_before_first_output() {
    for (count, capacity) in [(100u32, 10usize), (5, 10), (10, 10)] {
        let reader = RecordReader::new(Cursor::new(encode_numbered(count)), true);
        let mut shuffle = ShuffleReader::with_seed(reader, capacity, 0);

        let first = decode_number(&shuffle.read_next().unwrap().unwrap());
        let expected_fill = capacity.min(count as usize);
        assert_eq!(shuffle.consumed(), expected_fill as u64);
        assert_eq!(shuffle.pooled(), expected_fill - 1);
        assert!((first as usize) < expected_fill);
    }
}

#[test]
fn test_pool_refilled_after_each_output() {
    let reader = RecordReader::new(Cursor::new(encode_numbered(30)), true);
    let mut shuffle = ShuffleReader::with_seed(reader, 8, 5);

    for call in 1..=23u64 {
        shuffle.read_next().unwrap().unwrap();
        assert_eq!(shuffle.consumed(), 7 + call);
        assert_eq!(shuffle.pooled(), 7);
    }

    // Upstream exhausted; pool drains
    for remaining in (0..7).rev() {
        shuffle.read_next().unwrap().unwrap();
        assert_eq!(shuffle.pooled(), remaining);
    }
    assert!(shuffle.read_next().unwrap().is_none());
}

// =============================================================================
// Error Propagation
// =============================================================================

/// Read until the first error, checking no record repeats
fn drain_until_error<R: std::io::Read>(shuffle: &mut ShuffleReader<R>) -> (Vec<u32>, TfRecordError) {
    let mut seen = HashSet::new();
    let mut order = Vec::new();
    loop {
        match shuffle.read_next() {
            Ok(Some(record)) => {
                let n = decode_number(&record);
                assert!(seen.insert(n), "record {} returned twice", n);
                order.push(n);
            }
            Ok(None) => panic!("failed stream must not end cleanly"),
            Err(e) => return (order, e),
        }
    }
}

#[test]
fn test_upstream_truncation_surfaces() {
    let mut stream = encode_numbered(10);
    stream.extend_from_slice(&[1, 2, 3]);

    let reader = RecordReader::new(Cursor::new(stream), true);
    let mut shuffle = ShuffleReader::with_seed(reader, 4, 11);

    let (mut order, err) = drain_until_error(&mut shuffle);

    assert!(matches!(err, TfRecordError::Truncated { .. }));
    order.sort_unstable();
    assert_eq!(order, (0..10).collect::<Vec<_>>());
}

#[test]
fn test_upstream_checksum_error_surfaces() {
    let mut stream = encode_numbered(3);
    let last = stream.len() - 1;
    stream[last] ^= 0x55;

    let reader = RecordReader::new(Cursor::new(stream), true);
    let mut shuffle = ShuffleReader::with_seed(reader, 16, 0);

    let (mut order, err) = drain_until_error(&mut shuffle);

    assert!(matches!(err, TfRecordError::ChecksumMismatch { .. }));
    order.sort_unstable();
    assert_eq!(order, vec![0, 1]);
}

#[test]
fn test_large_pool_drains_before_truncation() {
    let mut stream = encode_numbered(100);
    stream.extend_from_slice(&[9, 9, 9]);

    let reader = RecordReader::new(Cursor::new(stream), true);
    let mut shuffle = ShuffleReader::with_seed(reader, 1000, 7);

    let (mut order, err) = drain_until_error(&mut shuffle);

    assert!(matches!(err, TfRecordError::Truncated { offset: 2000, .. }));
    order.sort_unstable();
    assert_eq!(order, (0..100).collect::<Vec<_>>());
    assert_eq!(shuffle.pooled(), 0);

    // Stays failed rather than reporting a clean end
    assert!(shuffle.read_next().is_err());
}

#[test]
fn test_large_pool_drains_before_corrupt_frame() {
    let mut stream = encode_numbered(100);
    // Payload of record 60: each frame is 20 bytes, payload after a 12-byte header
    stream[60 * 20 + 12] ^= 0x01;

    let reader = RecordReader::new(Cursor::new(stream), true);
    let mut shuffle = ShuffleReader::with_seed(reader, 1000, 3);

    let (mut order, err) = drain_until_error(&mut shuffle);

    assert!(matches!(
        err,
        TfRecordError::ChecksumMismatch { offset: 1200, .. }
    ));
    order.sort_unstable();
    assert_eq!(order, (0..60).collect::<Vec<_>>());
    assert!(shuffle.read_next().is_err());
}

// =============================================================================
// File Access
// =============================================================================

fn setup_temp_file() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("shuffle.tfrecord");
    (temp_dir, path)
}

#[test]
fn test_open_with_config() {
    let (_temp, path) = setup_temp_file();
    std::fs::write(&path, encode_numbered(64)).unwrap();

    let config = Config::builder()
        .shuffle_buffer_size(16)
        .shuffle_seed(8)
        .build();

    let first: Vec<u32> = ShuffleReader::open_with_config(&path, &config)
        .unwrap()
        .records()
        .map(|r| decode_number(&r.unwrap()))
        .collect();
    let second: Vec<u32> = ShuffleReader::open_with_config(&path, &config)
        .unwrap()
        .records()
        .map(|r| decode_number(&r.unwrap()))
        .collect();

    assert_eq!(first.len(), 64);
    assert_eq!(first, second);
}

#[test]
fn test_open_unseeded() {
    let (_temp, path) = setup_temp_file();
    std::fs::write(&path, encode_numbered(10)).unwrap();

    let shuffle = ShuffleReader::open(&path, true, 4).unwrap();
    assert_eq!(shuffle.capacity(), 4);
    assert_eq!(shuffle.records().count(), 10);
}
