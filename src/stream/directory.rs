//! Stream Directory
//!
//! Stream 0 stores one `DirectoryEntry` per stream, itself included, back
//! to back in id order. The file header's stream count says how many
//! entries to read. Every change rewrites the whole directory from offset
//! 0; there are no free slots or tombstones.

use std::collections::BTreeMap;
use std::io::{Read, Seek, Write};

use crate::error::{PageStoreError, Result};
use crate::layout::{
    validate_stream_name, DirectoryEntry, FileHeader, Record, StreamId, DIRECTORY_ENTRY_SIZE,
    DIRECTORY_STREAM, DIRECTORY_STREAM_NAME,
};
use crate::page::{PageAllocator, PageFile};

use super::StreamCursor;

/// Every known stream's cursor, keyed by stream id
#[derive(Debug, Default)]
pub struct Directory {
    streams: BTreeMap<StreamId, StreamCursor>,
}

impl Directory {
    /// Set up the directory of a brand-new file by creating stream 0
    pub fn bootstrap<F: Read + Write + Seek>(
        file: &mut PageFile<F>,
        header: &mut FileHeader,
    ) -> Result<Self> {
        let mut directory = Self::default();
        let id = directory.create_stream(file, header, DIRECTORY_STREAM_NAME)?;
        debug_assert_eq!(id, DIRECTORY_STREAM);
        Ok(directory)
    }

    /// Load every stream's cursor from the directory of an existing file
    ///
    /// Stream 0 is assembled by hand from the file header so that the
    /// ordinary read path can then pull its own entry and all others.
    pub fn load<F: Read + Write + Seek>(
        file: &mut PageFile<F>,
        header: &FileHeader,
    ) -> Result<Self> {
        let placeholder =
            DirectoryEntry::new(DIRECTORY_STREAM, DIRECTORY_STREAM_NAME, header.directory_page)?;
        let mut directory_cursor = StreamCursor::open(file, placeholder)?;

        let mut streams = BTreeMap::new();
        let mut buf = [0u8; DIRECTORY_ENTRY_SIZE];
        for _ in 0..header.stream_count {
            directory_cursor.read_exact(file, &mut buf)?;
            let entry = DirectoryEntry::decode(&buf)?;

            if entry.stream_id == DIRECTORY_STREAM {
                *directory_cursor.entry_mut() = entry;
            } else {
                let cursor = StreamCursor::open(file, entry)?;
                streams.insert(entry.stream_id, cursor);
            }
        }
        streams.insert(DIRECTORY_STREAM, directory_cursor);

        tracing::debug!(streams = streams.len(), "directory loaded");
        Ok(Self { streams })
    }

    // =========================================================================
    // Stream Management
    // =========================================================================

    /// Create a stream named `name` and persist the new directory
    ///
    /// Ids are dense and assigned in creation order.
    pub fn create_stream<F: Read + Write + Seek>(
        &mut self,
        file: &mut PageFile<F>,
        header: &mut FileHeader,
        name: &str,
    ) -> Result<StreamId> {
        validate_stream_name(name)?;
        if self.find(name).is_some() {
            return Err(PageStoreError::NameExists(name.to_string()));
        }

        let id = self.streams.len() as StreamId;
        let (page, source) = PageAllocator::allocate(file, header, id)?;
        if id == DIRECTORY_STREAM {
            header.directory_page = page.this_page;
        }
        let entry = DirectoryEntry::new(id, name, page.this_page)?;
        let data = vec![0u8; file.page_data_capacity()].into_boxed_slice();
        self.streams.insert(id, StreamCursor::new(entry, page, data));

        self.flush(file, header)?;

        header.stream_count += 1;
        file.write_file_header(header)?;

        tracing::debug!(
            stream_id = id,
            stream_name = name,
            first_page = page.this_page,
            ?source,
            "stream created"
        );
        Ok(id)
    }

    /// Id of the stream called `name`
    pub fn find(&self, name: &str) -> Option<StreamId> {
        self.streams
            .values()
            .find(|cursor| cursor.entry().has_name(name))
            .map(|cursor| cursor.stream_id())
    }

    pub fn cursor(&self, id: StreamId) -> Result<&StreamCursor> {
        self.streams.get(&id).ok_or(PageStoreError::InvalidStream(id))
    }

    pub fn cursor_mut(&mut self, id: StreamId) -> Result<&mut StreamCursor> {
        self.streams
            .get_mut(&id)
            .ok_or(PageStoreError::InvalidStream(id))
    }

    /// Directory entries in id order
    pub fn entries(&self) -> impl Iterator<Item = &DirectoryEntry> {
        self.streams.values().map(|cursor| cursor.entry())
    }

    pub fn len(&self) -> usize {
        self.streams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }

    // =========================================================================
    // Persistence
    // =========================================================================

    /// Rewrite the whole directory stream from offset 0
    ///
    /// Stream 0's own entry is recorded with the size the rewrite produces.
    pub fn flush<F: Read + Write + Seek>(
        &mut self,
        file: &mut PageFile<F>,
        header: &mut FileHeader,
    ) -> Result<()> {
        let directory_size = (self.streams.len() * DIRECTORY_ENTRY_SIZE) as u32;
        let directory = self.cursor_mut(DIRECTORY_STREAM)?;
        let entry = directory.entry_mut();
        entry.size = entry.size.max(directory_size);

        let mut bytes = Vec::with_capacity(directory_size as usize);
        for entry in self.entries() {
            bytes.extend_from_slice(&entry.encode()?);
        }

        let directory = self.cursor_mut(DIRECTORY_STREAM)?;
        directory.seek(file, 0)?;
        directory.write(file, header, &bytes)?;
        Ok(())
    }

    /// Write back every cursor's dirty page
    ///
    /// A failing page does not stop the others; the first error is returned
    /// and the failed cursors stay dirty.
    pub fn flush_pages<F: Read + Write + Seek>(&mut self, file: &mut PageFile<F>) -> Result<()> {
        let mut first_error = None;
        for cursor in self.streams.values_mut() {
            if let Err(e) = cursor.flush(file) {
                tracing::warn!(stream_id = cursor.stream_id(), error = %e, "page flush failed");
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Write the directory, every dirty page, then the file header
    ///
    /// Every step is attempted even when an earlier one fails.
    pub fn persist<F: Read + Write + Seek>(
        &mut self,
        file: &mut PageFile<F>,
        header: &mut FileHeader,
    ) -> Result<()> {
        let directory = self.flush(file, header);
        let pages = self.flush_pages(file);
        let written = file.write_file_header(header);
        directory.and(pages).and(written)
    }
}
