//! Tests for SharedStorage
//!
//! These tests verify:
//! - Clones share one storage
//! - Concurrent writers on separate streams
//! - Locked sequences of operations

use std::thread;

use pagestore::{PageStoreError, SharedStorage, Storage};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_shared(page_size: u32) -> (TempDir, std::path::PathBuf, SharedStorage) {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("shared.pgs");
    let mut storage = Storage::new();
    storage.create_with_page_size(&path, page_size).unwrap();
    (temp_dir, path, SharedStorage::new(storage))
}

// =============================================================================
// Tests
// =============================================================================

#[test]
fn test_clones_share_streams() {
    let (_temp, _path, shared) = setup_shared(128);
    let other = shared.clone();

    let id = shared.create_stream("common").unwrap();
    other.write(id, b"via clone").unwrap();

    assert_eq!(shared.open_stream("common").unwrap(), id);
    assert_eq!(shared.stream_position(id).unwrap(), 9);
}

#[test]
fn test_concurrent_writers_on_separate_streams() {
    let (_temp, path, shared) = setup_shared(64);
    let ids: Vec<_> = (0..4)
        .map(|i| shared.create_stream(&format!("writer-{}", i)).unwrap())
        .collect();

    let handles: Vec<_> = ids
        .iter()
        .map(|&id| {
            let shared = shared.clone();
            thread::spawn(move || {
                for chunk in 0..50u32 {
                    let bytes = (id * 1000 + chunk).to_le_bytes();
                    shared.write(id, &bytes).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    shared.close().unwrap();

    let mut storage = Storage::new();
    storage.open(&path).unwrap();
    for &id in &ids {
        assert_eq!(storage.stream_size(id).unwrap(), 200);
        let data = storage.read_to_end(id).unwrap();
        for (chunk, bytes) in data.chunks(4).enumerate() {
            let value = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
            assert_eq!(value, id * 1000 + chunk as u32);
        }
    }
}

#[test]
fn test_lock_holds_across_operations() {
    let (_temp, _path, shared) = setup_shared(128);
    let id = shared.create_stream("locked").unwrap();
    shared.write(id, b"abcdef").unwrap();

    let mut storage = shared.lock();
    storage.stream_seek(id, 2).unwrap();
    let mut buf = [0u8; 3];
    storage.read_exact(id, &mut buf).unwrap();

    assert_eq!(&buf, b"cde");
}

#[test]
fn test_positions_through_shared_handle() {
    let (_temp, _path, shared) = setup_shared(64);
    let id = shared.create_stream("pos").unwrap();
    shared.write(id, &[7u8; 150]).unwrap();
    shared.stream_seek(id, 120).unwrap();
    let pos = shared.file_position(id).unwrap();

    shared.stream_seek(id, 0).unwrap();
    shared.file_seek(id, &pos).unwrap();

    assert_eq!(shared.stream_position(id).unwrap(), 120);
    let mut buf = [0u8; 40];
    let outcome = shared.read(id, &mut buf).unwrap();
    assert_eq!(outcome.bytes_read, 30);
    assert!(outcome.end_of_stream);
}

#[test]
fn test_read_helpers_through_shared_handle() {
    let (_temp, _path, shared) = setup_shared(64);
    let id = shared.create_stream("helpers").unwrap();
    shared.write(id, b"0123456789").unwrap();

    assert_eq!(shared.stream_size(id).unwrap(), 10);
    let names: Vec<String> = shared.streams().unwrap().into_iter().map(|s| s.name).collect();
    assert_eq!(names.last().map(String::as_str), Some("helpers"));

    shared.stream_seek(id, 2).unwrap();
    let mut buf = [0u8; 3];
    shared.read_exact(id, &mut buf).unwrap();
    assert_eq!(&buf, b"234");
    assert_eq!(shared.read_to_end(id).unwrap(), b"56789");

    let mut rest = [0u8; 1];
    assert!(matches!(
        shared.read_exact(id, &mut rest),
        Err(PageStoreError::EndOfStream { bytes_read: 0 })
    ));
}

#[test]
fn test_closed_shared_storage() {
    let (_temp, _path, shared) = setup_shared(128);
    shared.flush().unwrap();
    shared.close().unwrap();

    assert!(matches!(
        shared.create_stream("late"),
        Err(PageStoreError::NotOpened)
    ));
}
