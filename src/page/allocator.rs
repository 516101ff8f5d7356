//! Page Allocator
//!
//! Decides where a stream's next page comes from and links it into the
//! stream's chain.
//!
//! ## Sources
//! - **Free list**: pop the head page (O(1)); the file header's free-list
//!   head moves to the popped page's next link.
//! - **File end**: write a fresh page at the current end of file and extend
//!   the file by one full page.
//!
//! Nothing in this crate returns pages to the free list yet; the consumer
//! side is kept so files carrying a free list remain usable.

use std::io::{Read, Seek, Write};

use crate::error::{PageStoreError, Result};
use crate::layout::{FileHeader, PageHeader, StreamId, NO_PAGE};
use crate::stream::StreamCursor;

use super::PageFile;

/// Where an allocated page came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageSource {
    FreeList,
    FileEnd,
}

/// Allocates pages for streams
pub struct PageAllocator;

impl PageAllocator {
    /// Take a fresh, empty, unlinked page owned by `stream_id`
    ///
    /// The free list is used first; the file only grows when it is empty.
    /// The returned header is already on disk.
    pub fn allocate<F: Read + Write + Seek>(
        file: &mut PageFile<F>,
        header: &mut FileHeader,
        stream_id: StreamId,
    ) -> Result<(PageHeader, PageSource)> {
        if header.first_free_page != NO_PAGE {
            let page = Self::pop_free_list(file, header, stream_id)?;
            tracing::trace!(stream_id, offset = page.this_page, "page taken from free list");
            Ok((page, PageSource::FreeList))
        } else {
            let page = Self::grow_file(file, stream_id)?;
            tracing::trace!(stream_id, offset = page.this_page, "page appended to file");
            Ok((page, PageSource::FileEnd))
        }
    }

    /// Allocate a page after the cursor's current page and make it current
    ///
    /// The current page must be the last page of its chain.
    pub fn append_page<F: Read + Write + Seek>(
        file: &mut PageFile<F>,
        header: &mut FileHeader,
        cursor: &mut StreamCursor,
    ) -> Result<PageSource> {
        assert!(
            cursor.page().is_last(),
            "page {} of stream {} already has a successor",
            cursor.page().this_page,
            cursor.stream_id()
        );

        let (page, source) = Self::allocate(file, header, cursor.stream_id())?;
        cursor.link_new_page(file, page)?;
        Ok(source)
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn pop_free_list<F: Read + Write + Seek>(
        file: &mut PageFile<F>,
        header: &mut FileHeader,
        stream_id: StreamId,
    ) -> Result<PageHeader> {
        let offset = header.first_free_page;
        let free = file.read_page_header(offset)?;

        // Unlink first so the header never points at a page in use
        header.first_free_page = free.next_page;
        file.write_file_header(header)?;

        let page = PageHeader::new(stream_id, offset);
        file.write_page_header(&page)?;
        Ok(page)
    }

    fn grow_file<F: Read + Write + Seek>(
        file: &mut PageFile<F>,
        stream_id: StreamId,
    ) -> Result<PageHeader> {
        let offset = file.end_offset()?;
        let end = offset as u64 + file.page_size() as u64;
        if end > u32::MAX as u64 {
            return Err(PageStoreError::StorageFull(end));
        }

        let page = PageHeader::new(stream_id, offset);
        file.create_page(&page)?;
        Ok(page)
    }
}
