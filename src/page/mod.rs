//! Page Module
//!
//! Page-level I/O and page allocation.
//!
//! ## Responsibilities
//! - Read/write page headers and fixed-size page bodies at file offsets
//! - Grow the file one full page at a time
//! - Hand out pages from the free list before growing the file
//! - Link freshly allocated pages onto the end of a stream's chain

pub mod allocator;
pub mod io;

pub use allocator::{PageAllocator, PageSource};
pub use io::PageFile;
