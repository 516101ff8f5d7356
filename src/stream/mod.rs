//! Stream Module
//!
//! Per-stream runtime state and the stream directory.
//!
//! ## Responsibilities
//! - Cache one page per open stream and move through its page chain
//! - Read, write and seek within a stream
//! - Persist every stream's directory entry in stream 0
//!
//! ## Cursor States
//! ```text
//!   page_pos <  used_bytes      more to read in this page
//!   page_pos == used_bytes      read must advance to the next page
//!   page_pos <  capacity        room to write in this page
//!   page_pos == capacity        write must flush and advance/allocate
//! ```

mod cursor;
mod directory;

use serde::{Deserialize, Serialize};

use crate::layout::{DirectoryEntry, StreamId};

pub use cursor::StreamCursor;
pub use directory::Directory;

/// Outcome of a read that did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadOutcome {
    /// Bytes copied into the caller's buffer
    pub bytes_read: usize,
    /// The chain ended before the buffer was filled
    pub end_of_stream: bool,
}

/// A remembered cursor position that can be restored without walking the
/// page chain.
///
/// Tokens stay valid across sessions as long as the stream is not
/// rewritten elsewhere, so they may be persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilePosition {
    /// File offset of the page holding the position
    pub(crate) page: u32,
    /// Offset within that page's data body
    pub(crate) offset_in_page: u32,
    /// Offset within the stream
    pub(crate) stream_offset: u32,
}

impl FilePosition {
    /// Stream offset this token points at
    pub fn stream_offset(&self) -> u32 {
        self.stream_offset
    }
}

/// Public view of a directory entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamInfo {
    pub id: StreamId,
    pub name: String,
    pub size: u32,
    pub first_page: u32,
}

impl From<&DirectoryEntry> for StreamInfo {
    fn from(entry: &DirectoryEntry) -> Self {
        Self {
            id: entry.stream_id,
            name: entry.name(),
            size: entry.size,
            first_page: entry.first_page,
        }
    }
}
