//! Tests for the stream directory
//!
//! These tests verify:
//! - Bootstrapping stream 0 in a new file
//! - Creating streams with dense ids and unique names
//! - Reloading every stream from stream 0
//! - Directories larger than one page
//! - Flushing keeps going past failed writes

use std::io::{self, Cursor, ErrorKind, Read, Seek, SeekFrom, Write};
use std::ops::Range;

use pagestore::layout::{
    FileHeader, StreamId, DIRECTORY_ENTRY_SIZE, DIRECTORY_STREAM, DIRECTORY_STREAM_NAME,
    FILE_HEADER_SIZE, PAGE_HEADER_SIZE,
};
use pagestore::page::PageFile;
use pagestore::stream::Directory;
use pagestore::PageStoreError;

type MemFile = PageFile<Cursor<Vec<u8>>>;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_directory(page_size: u32) -> (MemFile, FileHeader, Directory) {
    let mut header = FileHeader::new(page_size).unwrap();
    let mut file = PageFile::new(Cursor::new(Vec::new()), header.page_data_capacity());
    file.write_file_header(&header).unwrap();
    let directory = Directory::bootstrap(&mut file, &mut header).unwrap();
    (file, header, directory)
}

fn persist(file: &mut MemFile, header: &mut FileHeader, directory: &mut Directory) {
    directory.persist(file, header).unwrap();
}

/// In-memory store whose writes fail inside `fail_writes` once armed
struct FaultyStore {
    inner: Cursor<Vec<u8>>,
    fail_writes: Range<u64>,
    armed: bool,
}

impl FaultyStore {
    fn new(fail_writes: Range<u64>) -> Self {
        Self {
            inner: Cursor::new(Vec::new()),
            fail_writes,
            armed: false,
        }
    }
}

impl Read for FaultyStore {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl Write for FaultyStore {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let start = self.inner.position();
        let end = start + buf.len() as u64;
        if self.armed && start < self.fail_writes.end && self.fail_writes.start < end {
            return Err(io::Error::new(ErrorKind::Other, "injected write failure"));
        }
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl Seek for FaultyStore {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.inner.seek(pos)
    }
}

/// 1024-byte pages: directory at 24, stream `a` at 1048, stream `b` at 2072.
/// Both streams hold an unflushed page when this returns.
fn setup_faulty(
    fail_writes: Range<u64>,
) -> (PageFile<FaultyStore>, FileHeader, Directory, StreamId, StreamId) {
    let mut header = FileHeader::new(1024).unwrap();
    let mut file = PageFile::new(FaultyStore::new(fail_writes), header.page_data_capacity());
    file.write_file_header(&header).unwrap();
    let mut directory = Directory::bootstrap(&mut file, &mut header).unwrap();
    let a = directory.create_stream(&mut file, &mut header, "a").unwrap();
    let b = directory.create_stream(&mut file, &mut header, "b").unwrap();
    for (id, data) in [(a, b"AAAA"), (b, b"BBBB")] {
        directory
            .cursor_mut(id)
            .unwrap()
            .write(&mut file, &mut header, data)
            .unwrap();
    }
    file.get_mut().armed = true;
    (file, header, directory, a, b)
}

fn page_body(file: &PageFile<FaultyStore>, page: u32, len: usize) -> Vec<u8> {
    let start = page as usize + PAGE_HEADER_SIZE;
    file.get_ref().inner.get_ref()[start..start + len].to_vec()
}

// =============================================================================
// Bootstrap Tests
// =============================================================================

#[test]
fn test_bootstrap_creates_stream_zero() {
    let (_file, header, directory) = setup_directory(1024);

    assert_eq!(header.stream_count, 1);
    assert_eq!(header.directory_page, FILE_HEADER_SIZE as u32);
    assert_eq!(directory.len(), 1);

    let entry = directory.cursor(DIRECTORY_STREAM).unwrap().entry();
    assert_eq!(entry.name(), DIRECTORY_STREAM_NAME);
    assert_eq!(entry.first_page, FILE_HEADER_SIZE as u32);
    assert_eq!(entry.size, DIRECTORY_ENTRY_SIZE as u32);
}

#[test]
fn test_bootstrap_persists_header() {
    let (mut file, header, _directory) = setup_directory(1024);

    assert_eq!(file.read_file_header().unwrap(), header);
}

// =============================================================================
// Create Tests
// =============================================================================

#[test]
fn test_create_assigns_dense_ids() {
    let (mut file, mut header, mut directory) = setup_directory(1024);

    let a = directory.create_stream(&mut file, &mut header, "a").unwrap();
    let b = directory.create_stream(&mut file, &mut header, "b").unwrap();

    assert_eq!((a, b), (1, 2));
    assert_eq!(header.stream_count, 3);
    assert_eq!(directory.find("b"), Some(2));
    assert_eq!(directory.find("c"), None);
}

#[test]
fn test_create_duplicate_name_fails() {
    let (mut file, mut header, mut directory) = setup_directory(1024);
    directory.create_stream(&mut file, &mut header, "a").unwrap();
    let file_len = file.end_offset().unwrap();

    let result = directory.create_stream(&mut file, &mut header, "a");

    assert!(matches!(result, Err(PageStoreError::NameExists(ref n)) if n == "a"));
    assert_eq!(header.stream_count, 2);
    assert_eq!(directory.len(), 2);
    assert_eq!(file.end_offset().unwrap(), file_len);
}

#[test]
fn test_directory_name_is_taken() {
    let (mut file, mut header, mut directory) = setup_directory(1024);

    let result = directory.create_stream(&mut file, &mut header, DIRECTORY_STREAM_NAME);

    assert!(matches!(result, Err(PageStoreError::NameExists(_))));
}

#[test]
fn test_unknown_stream_id() {
    let (_file, _header, mut directory) = setup_directory(1024);

    assert!(matches!(
        directory.cursor_mut(9),
        Err(PageStoreError::InvalidStream(9))
    ));
}

// =============================================================================
// Load Tests
// =============================================================================

#[test]
fn test_load_restores_entries() {
    let (mut file, mut header, mut directory) = setup_directory(1024);
    for name in ["alpha", "beta", "gamma"] {
        directory.create_stream(&mut file, &mut header, name).unwrap();
    }
    let id = directory.find("beta").unwrap();
    directory
        .cursor_mut(id)
        .unwrap()
        .write(&mut file, &mut header, b"payload")
        .unwrap();
    persist(&mut file, &mut header, &mut directory);

    let loaded = Directory::load(&mut file, &header).unwrap();

    let names: Vec<String> = loaded.entries().map(|e| e.name()).collect();
    assert_eq!(names, vec![DIRECTORY_STREAM_NAME, "alpha", "beta", "gamma"]);
    assert_eq!(loaded.cursor(id).unwrap().size(), 7);
    assert_eq!(loaded.cursor(id).unwrap().stream_position(), 0);
    assert_eq!(
        loaded.cursor(DIRECTORY_STREAM).unwrap().size(),
        4 * DIRECTORY_ENTRY_SIZE as u32
    );
}

#[test]
fn test_directory_spanning_many_pages() {
    // 48-byte pages hold barely one entry each
    let (mut file, mut header, mut directory) = setup_directory(64);
    for i in 0..20 {
        directory
            .create_stream(&mut file, &mut header, &format!("stream-{}", i))
            .unwrap();
    }
    persist(&mut file, &mut header, &mut directory);

    let loaded = Directory::load(&mut file, &header).unwrap();

    assert_eq!(loaded.len(), 21);
    for i in 0..20 {
        assert_eq!(loaded.find(&format!("stream-{}", i)), Some(i + 1));
    }
}

#[test]
fn test_load_truncated_directory_fails() {
    let (mut file, mut header, mut directory) = setup_directory(1024);
    directory.create_stream(&mut file, &mut header, "a").unwrap();
    persist(&mut file, &mut header, &mut directory);

    // Claim more entries than stream 0 holds
    header.stream_count = 5;
    let result = Directory::load(&mut file, &header);

    assert!(matches!(result, Err(PageStoreError::EndOfStream { bytes_read: 0 })));
}

// =============================================================================
// Flush Failure Tests
// =============================================================================

#[test]
fn test_flush_pages_continues_past_failed_page() {
    // Writes to stream `a`'s page fail
    let (mut file, _header, mut directory, a, b) = setup_faulty(1048..2072);

    let result = directory.flush_pages(&mut file);

    assert!(matches!(result, Err(PageStoreError::Io(_))));
    assert!(directory.cursor(a).unwrap().is_dirty());
    assert!(!directory.cursor(b).unwrap().is_dirty());
    assert_eq!(page_body(&file, 2072, 4), b"BBBB");
}

#[test]
fn test_persist_writes_pages_and_header_after_directory_failure() {
    // Writes to the directory's page fail
    let (mut file, mut header, mut directory, a, b) = setup_faulty(24..1048);

    let result = directory.persist(&mut file, &mut header);

    assert!(matches!(result, Err(PageStoreError::Io(_))));
    assert!(directory.cursor(DIRECTORY_STREAM).unwrap().is_dirty());
    assert!(!directory.cursor(a).unwrap().is_dirty());
    assert!(!directory.cursor(b).unwrap().is_dirty());
    assert_eq!(page_body(&file, 1048, 4), b"AAAA");
    assert_eq!(page_body(&file, 2072, 4), b"BBBB");

    file.get_mut().armed = false;
    assert_eq!(file.read_file_header().unwrap(), header);
}
