//! Engine Module
//!
//! The storage façade that owns the file and coordinates all components.
//!
//! ## Responsibilities
//! - Create, open and close storage files
//! - Own the file header and every stream's cursor
//! - Route stream operations to the right cursor
//! - Flush dirty pages, the directory and the header on close

use std::fs::{File, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::config::{Config, SyncStrategy};
use crate::error::{PageStoreError, Result};
use crate::layout::{FileHeader, StreamId, FILE_HEADER_SIZE};
use crate::page::PageFile;
use crate::stream::{Directory, FilePosition, ReadOutcome, StreamCursor, StreamInfo};

/// A live storage file
struct Session {
    path: PathBuf,
    file: PageFile<File>,
    header: FileHeader,
    directory: Directory,
}

impl Session {
    fn cursor(&mut self, id: StreamId) -> Result<(&mut PageFile<File>, &mut StreamCursor)> {
        let cursor = self.directory.cursor_mut(id)?;
        Ok((&mut self.file, cursor))
    }

    /// Directory, dirty pages, then the header
    fn flush(&mut self, sync: SyncStrategy) -> Result<()> {
        self.directory.persist(&mut self.file, &mut self.header)?;
        if sync == SyncStrategy::OnClose {
            self.file.sync_all()?;
        }
        Ok(())
    }
}

/// Single-file storage of many named streams
///
/// ## Lifecycle
/// A `Storage` starts closed. `create` or `open` attaches it to a file,
/// `close` detaches it; every stream operation fails with `NotOpened` in
/// between. Dropping an open storage closes it.
///
/// ## Concurrency
/// One `Storage` assumes exclusive use of its file. Operations take
/// `&mut self`; wrap it in `SharedStorage` to share it between threads.
pub struct Storage {
    /// Engine configuration
    config: Config,

    /// The open file, if any
    session: Option<Session>,
}

impl Storage {
    /// Closed storage with the default configuration
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Closed storage with the given configuration
    pub fn with_config(config: Config) -> Self {
        Self {
            config,
            session: None,
        }
    }

    // =========================================================================
    // Storage Lifecycle
    // =========================================================================

    /// Create (or truncate) a storage file using the configured page size
    pub fn create(&mut self, path: impl AsRef<Path>) -> Result<()> {
        self.create_with_page_size(path, self.config.page_size)
    }

    /// Create (or truncate) a storage file with an explicit page size
    ///
    /// Writes the file header and bootstraps the directory stream.
    pub fn create_with_page_size(&mut self, path: impl AsRef<Path>, page_size: u32) -> Result<()> {
        if self.session.is_some() {
            return Err(PageStoreError::AlreadyOpened);
        }
        let path = path.as_ref();
        let mut header = FileHeader::new(page_size)?;

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        let mut file = PageFile::new(file, header.page_data_capacity());
        file.write_file_header(&header)?;

        let directory = Directory::bootstrap(&mut file, &mut header)?;

        tracing::debug!(path = %path.display(), page_size, "storage created");
        self.session = Some(Session {
            path: path.to_path_buf(),
            file,
            header,
            directory,
        });
        Ok(())
    }

    /// Open an existing storage file
    ///
    /// Validates magic and version before anything is written, then loads
    /// the directory and one cursor per stream.
    pub fn open(&mut self, path: impl AsRef<Path>) -> Result<()> {
        if self.session.is_some() {
            return Err(PageStoreError::AlreadyOpened);
        }
        let path = path.as_ref();

        let file = OpenOptions::new().read(true).write(true).open(path)?;
        let mut file = PageFile::new(file, 0);
        let header = match file.read_file_header() {
            Ok(header) => header,
            Err(PageStoreError::Io(e)) if e.kind() == ErrorKind::UnexpectedEof => {
                return Err(PageStoreError::NotAStorage);
            }
            Err(e) => return Err(e),
        };
        header.validate()?;
        file.set_page_data_capacity(header.page_data_capacity());

        let directory = Directory::load(&mut file, &header)?;

        tracing::debug!(
            path = %path.display(),
            page_size = header.page_size,
            streams = header.stream_count,
            "storage opened"
        );
        self.session = Some(Session {
            path: path.to_path_buf(),
            file,
            header,
            directory,
        });
        Ok(())
    }

    /// Flush everything and release the file
    ///
    /// The storage is closed afterwards even if flushing failed.
    pub fn close(&mut self) -> Result<()> {
        let mut session = self.session.take().ok_or(PageStoreError::NotOpened)?;
        session.flush(self.config.sync_strategy)?;
        tracing::debug!(path = %session.path.display(), "storage closed");
        Ok(())
    }

    /// Persist the directory, every dirty page and the header without closing
    pub fn flush(&mut self) -> Result<()> {
        let sync = self.config.sync_strategy;
        self.session_mut()?.flush(sync)
    }

    // =========================================================================
    // Streams
    // =========================================================================

    /// Create a new, empty stream
    pub fn create_stream(&mut self, name: &str) -> Result<StreamId> {
        let session = self.session_mut()?;
        session
            .directory
            .create_stream(&mut session.file, &mut session.header, name)
    }

    /// Look up a stream by name
    pub fn open_stream(&self, name: &str) -> Result<StreamId> {
        self.session()?
            .directory
            .find(name)
            .ok_or_else(|| PageStoreError::NameNotFound(name.to_string()))
    }

    /// Read up to `buf.len()` bytes from the stream's cursor
    ///
    /// Hitting the end of the stream is not an error: the outcome carries
    /// the bytes obtained and `end_of_stream = true`.
    pub fn read(&mut self, stream: StreamId, buf: &mut [u8]) -> Result<ReadOutcome> {
        let (file, cursor) = self.session_mut()?.cursor(stream)?;
        cursor.read(file, buf)
    }

    /// Fill `buf` or fail with `EndOfStream { bytes_read }`
    pub fn read_exact(&mut self, stream: StreamId, buf: &mut [u8]) -> Result<()> {
        let (file, cursor) = self.session_mut()?.cursor(stream)?;
        cursor.read_exact(file, buf)
    }

    /// Read from the cursor to the end of the stream
    pub fn read_to_end(&mut self, stream: StreamId) -> Result<Vec<u8>> {
        let (file, cursor) = self.session_mut()?.cursor(stream)?;
        let remaining = cursor.size().saturating_sub(cursor.stream_position());
        let mut buf = vec![0u8; remaining as usize];
        let outcome = cursor.read(file, &mut buf)?;
        buf.truncate(outcome.bytes_read);
        Ok(buf)
    }

    /// Write all of `data` at the stream's cursor
    pub fn write(&mut self, stream: StreamId, data: &[u8]) -> Result<()> {
        let session = self.session_mut()?;
        let cursor = session.directory.cursor_mut(stream)?;
        cursor.write(&mut session.file, &mut session.header, data)
    }

    /// Move the cursor to an absolute stream offset (walks the page chain)
    pub fn stream_seek(&mut self, stream: StreamId, offset: u32) -> Result<()> {
        let (file, cursor) = self.session_mut()?.cursor(stream)?;
        cursor.seek(file, offset)
    }

    /// Current stream offset of the cursor
    pub fn stream_position(&self, stream: StreamId) -> Result<u32> {
        Ok(self.session()?.directory.cursor(stream)?.stream_position())
    }

    /// Capture the cursor position for a later `file_seek`
    pub fn file_position(&self, stream: StreamId) -> Result<FilePosition> {
        Ok(self.session()?.directory.cursor(stream)?.position())
    }

    /// Restore a position captured by `file_position` without a chain walk
    pub fn file_seek(&mut self, stream: StreamId, pos: &FilePosition) -> Result<()> {
        let (file, cursor) = self.session_mut()?.cursor(stream)?;
        cursor.restore(file, pos)
    }

    /// Recorded size of a stream
    pub fn stream_size(&self, stream: StreamId) -> Result<u32> {
        Ok(self.session()?.directory.cursor(stream)?.size())
    }

    /// Every stream's directory entry, in id order
    pub fn streams(&self) -> Result<Vec<StreamInfo>> {
        Ok(self
            .session()?
            .directory
            .entries()
            .map(StreamInfo::from)
            .collect())
    }

    /// Number of streams, the directory included
    pub fn stream_count(&self) -> Result<usize> {
        Ok(self.session()?.directory.len())
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn is_open(&self) -> bool {
        self.session.is_some()
    }

    /// Path of the open file
    pub fn path(&self) -> Result<&Path> {
        Ok(&self.session()?.path)
    }

    /// Copy of the in-memory file header
    pub fn file_header(&self) -> Result<FileHeader> {
        Ok(self.session()?.header)
    }

    pub fn page_size(&self) -> Result<u32> {
        Ok(self.session()?.header.page_size)
    }

    /// Data bytes per page
    pub fn page_data_capacity(&self) -> Result<usize> {
        Ok(self.session()?.header.page_data_capacity())
    }

    /// Number of pages the file currently holds
    pub fn page_count(&self) -> Result<u64> {
        let session = self.session()?;
        let len = session.file.get_ref().metadata()?.len();
        Ok(len.saturating_sub(FILE_HEADER_SIZE as u64) / session.header.page_size as u64)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn session(&self) -> Result<&Session> {
        self.session.as_ref().ok_or(PageStoreError::NotOpened)
    }

    fn session_mut(&mut self) -> Result<&mut Session> {
        self.session.as_mut().ok_or(PageStoreError::NotOpened)
    }
}

impl Default for Storage {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Storage {
    fn drop(&mut self) {
        if self.session.is_some() {
            if let Err(e) = self.close() {
                tracing::warn!("Failed to close storage on drop: {}", e);
            }
        }
    }
}
