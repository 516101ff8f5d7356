//! Page I/O
//!
//! Positioned reads and writes of the file header, page headers and page
//! bodies. Every call transfers a whole record or fails: a short read
//! surfaces as `UnexpectedEof`, a short write as `WriteZero`.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};

use crate::error::{PageStoreError, Result};
use crate::layout::{FileHeader, PageHeader, Record, PAGE_HEADER_SIZE};

/// A storage file viewed as a header followed by fixed-size pages
pub struct PageFile<F = File> {
    /// Underlying file (or any seekable byte store)
    inner: F,
    /// Data bytes per page (`page_size - PAGE_HEADER_SIZE`)
    page_data_capacity: usize,
}

impl<F: Read + Write + Seek> PageFile<F> {
    pub fn new(inner: F, page_data_capacity: usize) -> Self {
        Self {
            inner,
            page_data_capacity,
        }
    }

    /// Data bytes per page
    pub fn page_data_capacity(&self) -> usize {
        self.page_data_capacity
    }

    /// Full page size, header included
    pub fn page_size(&self) -> usize {
        self.page_data_capacity + PAGE_HEADER_SIZE
    }

    /// Change the page geometry once the real file header is known
    pub(crate) fn set_page_data_capacity(&mut self, capacity: usize) {
        self.page_data_capacity = capacity;
    }

    // =========================================================================
    // File Header
    // =========================================================================

    pub fn read_file_header(&mut self) -> Result<FileHeader> {
        let mut buf = [0u8; FileHeader::SIZE];
        self.read_at(0, &mut buf)?;
        FileHeader::decode(&buf)
    }

    pub fn write_file_header(&mut self, header: &FileHeader) -> Result<()> {
        let bytes = header.encode()?;
        self.write_at(0, &bytes)
    }

    // =========================================================================
    // Page Headers
    // =========================================================================

    /// Read the page header stored at `offset`
    pub fn read_page_header(&mut self, offset: u32) -> Result<PageHeader> {
        let mut buf = [0u8; PageHeader::SIZE];
        self.read_at(offset as u64, &mut buf)?;
        PageHeader::decode(&buf)
    }

    /// Write a page header at its own recorded offset
    pub fn write_page_header(&mut self, header: &PageHeader) -> Result<()> {
        let bytes = header.encode()?;
        self.write_at(header.this_page as u64, &bytes)
    }

    // =========================================================================
    // Page Data
    // =========================================================================

    /// Read the data body that follows `header` into `buf`
    ///
    /// `buf` must be exactly one page body long.
    pub fn read_page_data(&mut self, header: &PageHeader, buf: &mut [u8]) -> Result<()> {
        debug_assert_eq!(buf.len(), self.page_data_capacity);
        self.read_at(header.data_offset(), buf)
    }

    /// Write `buf` as the data body following `header`
    pub fn write_page_data(&mut self, header: &PageHeader, buf: &[u8]) -> Result<()> {
        debug_assert_eq!(buf.len(), self.page_data_capacity);
        self.write_at(header.data_offset(), buf)
    }

    /// Write header and body of one page
    pub fn write_page(&mut self, header: &PageHeader, buf: &[u8]) -> Result<()> {
        self.write_page_header(header)?;
        self.write_page_data(header, buf)
    }

    /// Write the header of a brand-new page and extend the file to cover the
    /// whole page by writing one byte at its last offset.
    pub fn create_page(&mut self, header: &PageHeader) -> Result<()> {
        self.write_page_header(header)?;
        let last_byte = header.this_page as u64 + self.page_size() as u64 - 1;
        self.write_at(last_byte, &[0u8])
    }

    // =========================================================================
    // File Geometry
    // =========================================================================

    /// Current end of file, which is where the next grown page starts
    pub fn end_offset(&mut self) -> Result<u32> {
        let end = self.inner.seek(SeekFrom::End(0))?;
        u32::try_from(end).map_err(|_| PageStoreError::StorageFull(end))
    }

    /// Flush buffered writes of the underlying store
    pub fn flush(&mut self) -> Result<()> {
        self.inner.flush()?;
        Ok(())
    }

    pub fn get_ref(&self) -> &F {
        &self.inner
    }

    pub fn get_mut(&mut self) -> &mut F {
        &mut self.inner
    }

    pub fn into_inner(self) -> F {
        self.inner
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<()> {
        self.inner.seek(SeekFrom::Start(offset))?;
        self.inner.read_exact(buf)?;
        Ok(())
    }

    fn write_at(&mut self, offset: u64, buf: &[u8]) -> Result<()> {
        self.inner.seek(SeekFrom::Start(offset))?;
        self.inner.write_all(buf)?;
        Ok(())
    }
}

impl PageFile<File> {
    /// fsync data and metadata
    pub fn sync_all(&mut self) -> Result<()> {
        self.inner.sync_all()?;
        Ok(())
    }
}
