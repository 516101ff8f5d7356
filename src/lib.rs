//! # pagestore
//!
//! A structured storage engine: one flat file hosting many independent,
//! named byte streams with:
//! - Fixed-size pages chained per stream through on-disk file offsets
//! - A directory stream (stream 0) describing every stream, itself included
//! - A free page list consumed before the file grows
//! - Cheap captured positions that skip the page-chain walk
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Storage (façade)                          │
//! │          create / open / close, stream operations            │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌──────────────┐
//!   │  Directory  │─────────▶│ StreamCursor │  (one per stream)
//!   │ (stream 0)  │          │ cached page  │
//!   └─────────────┘          └──────┬───────┘
//!                                   │
//!                    ┌──────────────┴─────────────┐
//!                    ▼                            ▼
//!            ┌───────────────┐           ┌───────────────┐
//!            │ PageAllocator │──────────▶│   PageFile    │
//!            │ free list/grow│           │  (page I/O)   │
//!            └───────────────┘           └───────────────┘
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use pagestore::Storage;
//!
//! # fn main() -> pagestore::Result<()> {
//! let mut storage = Storage::new();
//! storage.create("data.pgs")?;
//! let log = storage.create_stream("log")?;
//! storage.write(log, b"hello")?;
//! storage.stream_seek(log, 0)?;
//! let mut buf = [0u8; 5];
//! storage.read_exact(log, &mut buf)?;
//! storage.close()?;
//! # Ok(())
//! # }
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod layout;
pub mod page;
pub mod stream;
pub mod engine;
pub mod shared;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{PageStoreError, Result};
pub use config::{Config, SyncStrategy};
pub use engine::Storage;
pub use layout::{StreamId, DIRECTORY_STREAM};
pub use shared::SharedStorage;
pub use stream::{FilePosition, ReadOutcome, StreamInfo};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of pagestore
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
