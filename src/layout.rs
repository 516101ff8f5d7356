//! Binary Layout
//!
//! Fixed-width on-disk records. Every field is a 4-byte little-endian
//! integer except the 32-byte stream name; records carry no length
//! prefixes and no padding.
//!
//! ## File Format
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │ File Header (24 bytes)                                          │
//! │   Magic | Version | FirstFreePage | Stream0Page | Streams | PgSz │
//! ├─────────────────────────────────────────────────────────────────┤
//! │ Page (page_size bytes, repeated)                                │
//! │ ┌───────────────────────────────────────────────────────────┐   │
//! │ │ Page Header (16 bytes)                                    │   │
//! │ │   StreamId | UsedBytes | NextPage | ThisPage              │   │
//! │ ├───────────────────────────────────────────────────────────┤   │
//! │ │ Data (page_size - 16 bytes)                               │   │
//! │ └───────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Stream 0 holds one 44-byte directory entry per stream, back to back:
//! ```text
//! ┌──────────────┬────────────┬───────────────┬─────────────┐
//! │ StreamId (4) │ Name (32)  │ FirstPage (4) │ Size (4)    │
//! └──────────────┴────────────┴───────────────┴─────────────┘
//! ```

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{PageStoreError, Result};

/// Identifier of a stream; dense, assigned in creation order
pub type StreamId = u32;

// =============================================================================
// Format Constants
// =============================================================================

/// Magic number identifying a pagestore file
pub const MAGIC: u32 = 0xff78_3445;

/// Current on-disk format version
pub const VERSION: u32 = 1;

/// Stream id reserved for the directory stream
pub const DIRECTORY_STREAM: StreamId = 0;

/// Name recorded for the directory stream
pub const DIRECTORY_STREAM_NAME: &str = "PaGiNgSyStEm";

/// Page size used when none is given
pub const DEFAULT_PAGE_SIZE: u32 = 1024;

/// Largest accepted page size; every open stream buffers one page body
pub const MAX_PAGE_SIZE: u32 = 16 * 1024 * 1024;

/// Width of the on-disk name field
pub const MAX_STREAM_NAME: usize = 32;

/// File offset meaning "no page" (end of chain, empty free list)
pub const NO_PAGE: u32 = 0;

/// File Header: 6 × u32 = 24 bytes
pub const FILE_HEADER_SIZE: usize = 24;

/// Page Header: 4 × u32 = 16 bytes
pub const PAGE_HEADER_SIZE: usize = 16;

/// Directory Entry: u32 + [u8; 32] + 2 × u32 = 44 bytes
pub const DIRECTORY_ENTRY_SIZE: usize = 44;

// =============================================================================
// Record Codec
// =============================================================================

/// A fixed-width record encoded with bincode's fixed-int little-endian layout
pub trait Record: Serialize + DeserializeOwned {
    /// Encoded size in bytes
    const SIZE: usize;

    fn encode(&self) -> Result<Vec<u8>> {
        let bytes = bincode::serialize(self)?;
        debug_assert_eq!(bytes.len(), Self::SIZE);
        Ok(bytes)
    }

    fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < Self::SIZE {
            return Err(PageStoreError::Serialization(format!(
                "Record truncated: expected {} bytes, got {}",
                Self::SIZE,
                bytes.len()
            )));
        }
        Ok(bincode::deserialize(&bytes[..Self::SIZE])?)
    }
}

// =============================================================================
// File Header
// =============================================================================

/// Header at offset 0 of every storage file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileHeader {
    pub magic: u32,
    pub version: u32,
    /// Head of the free page list, `NO_PAGE` when empty
    pub first_free_page: u32,
    /// First page of the directory stream
    pub directory_page: u32,
    pub stream_count: u32,
    pub page_size: u32,
}

impl Record for FileHeader {
    const SIZE: usize = FILE_HEADER_SIZE;
}

impl FileHeader {
    /// Header for a fresh file: empty free list, no streams yet.
    /// The directory's first page directly follows the header.
    pub fn new(page_size: u32) -> Result<Self> {
        validate_page_size(page_size)?;
        Ok(Self {
            magic: MAGIC,
            version: VERSION,
            first_free_page: NO_PAGE,
            directory_page: FILE_HEADER_SIZE as u32,
            stream_count: 0,
            page_size,
        })
    }

    /// Check magic, version and page size of a header read from disk
    pub fn validate(&self) -> Result<()> {
        if self.magic != MAGIC {
            return Err(PageStoreError::NotAStorage);
        }
        if self.version != VERSION {
            return Err(PageStoreError::UnsupportedVersion(self.version));
        }
        validate_page_size(self.page_size)
    }

    /// Bytes of stream data one page can hold
    pub fn page_data_capacity(&self) -> usize {
        self.page_size as usize - PAGE_HEADER_SIZE
    }
}

/// A page must hold at least one data byte after its header and stay
/// within `MAX_PAGE_SIZE`
pub fn validate_page_size(page_size: u32) -> Result<()> {
    if (page_size as usize) <= PAGE_HEADER_SIZE || page_size > MAX_PAGE_SIZE {
        return Err(PageStoreError::InvalidPageSize(page_size));
    }
    Ok(())
}

// =============================================================================
// Page Header
// =============================================================================

/// Header at the start of every page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageHeader {
    /// Owning stream
    pub stream_id: StreamId,
    /// Data bytes in use, `0..=page_data_capacity`
    pub used_bytes: u32,
    /// Next page of the same stream, `NO_PAGE` at end of chain
    pub next_page: u32,
    /// File offset of this page
    pub this_page: u32,
}

impl Record for PageHeader {
    const SIZE: usize = PAGE_HEADER_SIZE;
}

impl PageHeader {
    /// Empty, unlinked page owned by `stream_id`
    pub fn new(stream_id: StreamId, this_page: u32) -> Self {
        Self {
            stream_id,
            used_bytes: 0,
            next_page: NO_PAGE,
            this_page,
        }
    }

    /// Whether this page ends its chain
    pub fn is_last(&self) -> bool {
        self.next_page == NO_PAGE
    }

    /// File offset of the data body following the header
    pub fn data_offset(&self) -> u64 {
        self.this_page as u64 + PAGE_HEADER_SIZE as u64
    }
}

// =============================================================================
// Directory Entry
// =============================================================================

/// Persisted description of one stream, stored in stream 0
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    pub stream_id: StreamId,
    /// NUL-terminated name; bytes after the terminator are ignored
    pub name: [u8; MAX_STREAM_NAME],
    pub first_page: u32,
    /// Total stream size in bytes
    pub size: u32,
}

impl Record for DirectoryEntry {
    const SIZE: usize = DIRECTORY_ENTRY_SIZE;
}

impl DirectoryEntry {
    /// Entry for a brand-new, empty stream
    pub fn new(stream_id: StreamId, name: &str, first_page: u32) -> Result<Self> {
        validate_stream_name(name)?;
        let mut field = [0u8; MAX_STREAM_NAME];
        field[..name.len()].copy_from_slice(name.as_bytes());
        Ok(Self {
            stream_id,
            name: field,
            first_page,
            size: 0,
        })
    }

    /// Name bytes up to the first NUL
    pub fn name_bytes(&self) -> &[u8] {
        let end = self
            .name
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(MAX_STREAM_NAME);
        &self.name[..end]
    }

    pub fn name(&self) -> String {
        String::from_utf8_lossy(self.name_bytes()).into_owned()
    }

    pub fn has_name(&self, name: &str) -> bool {
        self.name_bytes() == name.as_bytes()
    }
}

/// Names are 1..=31 bytes with no NUL, leaving room for the terminator
pub fn validate_stream_name(name: &str) -> Result<()> {
    if name.is_empty() || name.len() >= MAX_STREAM_NAME || name.contains('\0') {
        return Err(PageStoreError::InvalidStreamName(name.to_string()));
    }
    Ok(())
}
