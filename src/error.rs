//! Error types for pagestore
//!
//! Provides a unified error type for all storage operations.

use thiserror::Error;

use crate::layout::StreamId;

/// Result type alias using PageStoreError
pub type Result<T> = std::result::Result<T, PageStoreError>;

/// Unified error type for pagestore operations
#[derive(Debug, Error)]
pub enum PageStoreError {
    // -------------------------------------------------------------------------
    // Session Errors
    // -------------------------------------------------------------------------
    #[error("Storage is not opened")]
    NotOpened,

    #[error("Storage is already opened")]
    AlreadyOpened,

    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage full: file offset {0} does not fit in a 4-byte field")]
    StorageFull(u64),

    // -------------------------------------------------------------------------
    // Format Errors
    // -------------------------------------------------------------------------
    #[error("Not a storage file")]
    NotAStorage,

    #[error("Unsupported storage version: {0}")]
    UnsupportedVersion(u32),

    #[error("Invalid page size {0}: must exceed the page header size and not exceed 16 MiB")]
    InvalidPageSize(u32),

    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Stream Errors
    // -------------------------------------------------------------------------
    #[error("Invalid stream id: {0}")]
    InvalidStream(StreamId),

    #[error("Invalid stream name: {0:?}")]
    InvalidStreamName(String),

    #[error("Stream name already exists: {0}")]
    NameExists(String),

    #[error("Stream name not found: {0}")]
    NameNotFound(String),

    #[error("Seek out of range: offset {offset} exceeds stream size {size}")]
    SeekOutOfRange { offset: u32, size: u32 },

    #[error("Position does not belong to stream {0}")]
    InvalidPosition(StreamId),

    #[error("End of stream after {bytes_read} bytes")]
    EndOfStream { bytes_read: usize },
}

impl From<bincode::Error> for PageStoreError {
    fn from(e: bincode::Error) -> Self {
        PageStoreError::Serialization(e.to_string())
    }
}
