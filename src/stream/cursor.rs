//! Stream Cursor
//!
//! Runtime state for one open stream: its directory entry, the cached
//! current page (header + data body), positions and a dirty flag.

use std::io::{Read, Seek, Write};

use crate::error::{PageStoreError, Result};
use crate::layout::{DirectoryEntry, FileHeader, PageHeader, StreamId, FILE_HEADER_SIZE};
use crate::page::{PageAllocator, PageFile};

use super::{FilePosition, ReadOutcome};

/// Read/write position and cached current page of one stream
#[derive(Debug)]
pub struct StreamCursor {
    /// Persisted description of the stream
    entry: DirectoryEntry,
    /// Cached header of the current page
    page: PageHeader,
    /// Cached data body of the current page (one page capacity long)
    data: Box<[u8]>,
    /// Byte offset within the stream
    stream_pos: u32,
    /// Byte offset within the current page's data body
    page_pos: usize,
    /// Cached page has changes not yet on disk
    dirty: bool,
}

impl StreamCursor {
    /// Cursor positioned at offset 0 on an already-read first page
    pub fn new(entry: DirectoryEntry, page: PageHeader, data: Box<[u8]>) -> Self {
        Self {
            entry,
            page,
            data,
            stream_pos: 0,
            page_pos: 0,
            dirty: false,
        }
    }

    /// Load the stream's first page from disk and position at offset 0
    pub fn open<F: Read + Write + Seek>(
        file: &mut PageFile<F>,
        entry: DirectoryEntry,
    ) -> Result<Self> {
        let page = file.read_page_header(entry.first_page)?;
        let mut data = vec![0u8; file.page_data_capacity()].into_boxed_slice();
        file.read_page_data(&page, &mut data)?;
        Ok(Self::new(entry, page, data))
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn stream_id(&self) -> StreamId {
        self.entry.stream_id
    }

    pub fn entry(&self) -> &DirectoryEntry {
        &self.entry
    }

    pub(crate) fn entry_mut(&mut self) -> &mut DirectoryEntry {
        &mut self.entry
    }

    /// Recorded stream size in bytes
    pub fn size(&self) -> u32 {
        self.entry.size
    }

    /// Header of the cached page
    pub fn page(&self) -> &PageHeader {
        &self.page
    }

    /// Offset within the stream
    pub fn stream_position(&self) -> u32 {
        self.stream_pos
    }

    /// Offset within the cached page
    pub fn page_position(&self) -> usize {
        self.page_pos
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    fn capacity(&self) -> usize {
        self.data.len()
    }

    fn unread_in_page(&self) -> usize {
        self.page.used_bytes as usize - self.page_pos
    }

    fn room_in_page(&self) -> usize {
        self.capacity() - self.page_pos
    }

    // =========================================================================
    // Read / Write
    // =========================================================================

    /// Read up to `buf.len()` bytes, crossing page boundaries as needed
    ///
    /// Running off the end of the chain is reported through
    /// `ReadOutcome::end_of_stream` together with the bytes obtained so far.
    pub fn read<F: Read + Write + Seek>(
        &mut self,
        file: &mut PageFile<F>,
        buf: &mut [u8],
    ) -> Result<ReadOutcome> {
        let mut done = 0;
        while done < buf.len() {
            if self.unread_in_page() == 0 {
                if !self.advance(file)? {
                    return Ok(ReadOutcome {
                        bytes_read: done,
                        end_of_stream: true,
                    });
                }
                continue;
            }
            done += self.read_block(&mut buf[done..]);
        }
        Ok(ReadOutcome {
            bytes_read: done,
            end_of_stream: false,
        })
    }

    /// Fill `buf` completely or fail with `EndOfStream`
    pub fn read_exact<F: Read + Write + Seek>(
        &mut self,
        file: &mut PageFile<F>,
        buf: &mut [u8],
    ) -> Result<()> {
        let outcome = self.read(file, buf)?;
        if outcome.end_of_stream {
            return Err(PageStoreError::EndOfStream {
                bytes_read: outcome.bytes_read,
            });
        }
        Ok(())
    }

    /// Write all of `buf`, flushing full pages and allocating new ones
    pub fn write<F: Read + Write + Seek>(
        &mut self,
        file: &mut PageFile<F>,
        header: &mut FileHeader,
        buf: &[u8],
    ) -> Result<()> {
        let mut done = 0;
        while done < buf.len() {
            if self.room_in_page() == 0 {
                self.flush(file)?;
                if !self.advance(file)? {
                    PageAllocator::append_page(file, header, self)?;
                }
                continue;
            }
            done += self.write_block(&buf[done..]);
        }
        Ok(())
    }

    /// Copy out of the cached page; never crosses a page boundary
    fn read_block(&mut self, dst: &mut [u8]) -> usize {
        let n = dst.len().min(self.unread_in_page());
        dst[..n].copy_from_slice(&self.data[self.page_pos..self.page_pos + n]);
        self.page_pos += n;
        self.stream_pos += n as u32;
        n
    }

    /// Copy into the cached page; never crosses a page boundary
    fn write_block(&mut self, src: &[u8]) -> usize {
        let n = src.len().min(self.room_in_page());
        self.data[self.page_pos..self.page_pos + n].copy_from_slice(&src[..n]);
        self.page_pos += n;
        if self.page_pos > self.page.used_bytes as usize {
            self.page.used_bytes = self.page_pos as u32;
        }
        self.stream_pos += n as u32;
        if self.stream_pos > self.entry.size {
            self.entry.size = self.stream_pos;
        }
        self.dirty = true;
        n
    }

    // =========================================================================
    // Positioning
    // =========================================================================

    /// Move to an absolute stream offset by walking the chain from the
    /// first page. Costs one header read per page before the target.
    ///
    /// An offset that ends a page resolves to the start of the next page
    /// when there is one.
    pub fn seek<F: Read + Write + Seek>(
        &mut self,
        file: &mut PageFile<F>,
        offset: u32,
    ) -> Result<()> {
        if offset > self.entry.size {
            return Err(PageStoreError::SeekOutOfRange {
                offset,
                size: self.entry.size,
            });
        }

        // The walk reads headers from disk, so the cached page must be there
        self.flush(file)?;

        let mut page = file.read_page_header(self.entry.first_page)?;
        let mut page_start = 0u32;
        let mut walked = 0usize;
        loop {
            let page_end = page_start + page.used_bytes;
            if offset < page_end || (offset == page_end && page.is_last()) {
                break;
            }
            assert!(
                !page.is_last(),
                "stream {} chain ends at {} before offset {}",
                self.entry.stream_id,
                page_end,
                offset
            );
            page_start = page_end;
            page = file.read_page_header(page.next_page)?;
            walked += 1;
        }
        tracing::trace!(
            stream_id = self.entry.stream_id,
            offset,
            pages = walked,
            "chain walk"
        );

        self.load_page(file, page)?;
        self.page_pos = (offset - page_start) as usize;
        self.stream_pos = offset;
        Ok(())
    }

    /// Capture the current position as a restorable token
    pub fn position(&self) -> FilePosition {
        FilePosition {
            page: self.page.this_page,
            offset_in_page: self.page_pos as u32,
            stream_offset: self.stream_pos,
        }
    }

    /// Jump straight to a previously captured position
    ///
    /// The token's page must belong to this stream and the in-page offset
    /// must lie within the page's used bytes.
    pub fn restore<F: Read + Write + Seek>(
        &mut self,
        file: &mut PageFile<F>,
        pos: &FilePosition,
    ) -> Result<()> {
        let invalid = PageStoreError::InvalidPosition(self.entry.stream_id);
        let page_size = file.page_size() as u32;
        if pos.page < FILE_HEADER_SIZE as u32
            || (pos.page - FILE_HEADER_SIZE as u32) % page_size != 0
            || pos.stream_offset > self.entry.size
        {
            return Err(invalid);
        }

        self.flush(file)?;

        let page = file.read_page_header(pos.page)?;
        if page.stream_id != self.entry.stream_id
            || page.this_page != pos.page
            || pos.offset_in_page > page.used_bytes
        {
            return Err(invalid);
        }

        self.load_page(file, page)?;
        self.page_pos = pos.offset_in_page as usize;
        self.stream_pos = pos.stream_offset;
        Ok(())
    }

    // =========================================================================
    // Page Management
    // =========================================================================

    /// Write the cached page back if it has unflushed changes
    pub fn flush<F: Read + Write + Seek>(&mut self, file: &mut PageFile<F>) -> Result<()> {
        if self.dirty {
            file.write_page(&self.page, &self.data)?;
            self.dirty = false;
            tracing::trace!(
                stream_id = self.entry.stream_id,
                offset = self.page.this_page,
                used = self.page.used_bytes,
                "page flushed"
            );
        }
        Ok(())
    }

    /// Move to the next page of the chain; `false` at end of chain
    fn advance<F: Read + Write + Seek>(&mut self, file: &mut PageFile<F>) -> Result<bool> {
        if self.page.is_last() {
            return Ok(false);
        }
        let next = file.read_page_header(self.page.next_page)?;
        self.load_page(file, next)?;
        Ok(true)
    }

    /// Make `page` the cached page, flushing the old one first
    fn load_page<F: Read + Write + Seek>(
        &mut self,
        file: &mut PageFile<F>,
        page: PageHeader,
    ) -> Result<()> {
        self.flush(file)?;
        file.read_page_data(&page, &mut self.data)?;
        self.page = page;
        self.page_pos = 0;
        Ok(())
    }

    /// Chain a freshly allocated page after the current one and move onto it
    pub(crate) fn link_new_page<F: Read + Write + Seek>(
        &mut self,
        file: &mut PageFile<F>,
        page: PageHeader,
    ) -> Result<()> {
        self.page.next_page = page.this_page;
        if self.dirty {
            self.flush(file)?;
        } else {
            file.write_page_header(&self.page)?;
        }

        self.page = page;
        self.data.fill(0);
        self.page_pos = 0;
        Ok(())
    }
}
