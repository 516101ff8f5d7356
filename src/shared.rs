//! Shared Storage
//!
//! A cloneable, thread-safe handle to one `Storage`. Every call takes the
//! lock for its whole duration, so operations on one stream never
//! interleave.

use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

use crate::error::Result;
use crate::layout::StreamId;
use crate::stream::{FilePosition, ReadOutcome, StreamInfo};
use crate::Storage;

/// `Storage` behind an `Arc<Mutex<_>>`
#[derive(Clone)]
pub struct SharedStorage {
    inner: Arc<Mutex<Storage>>,
}

impl SharedStorage {
    pub fn new(storage: Storage) -> Self {
        Self {
            inner: Arc::new(Mutex::new(storage)),
        }
    }

    /// Exclusive access for a sequence of operations, or for any `Storage`
    /// method without a passthrough here
    pub fn lock(&self) -> MutexGuard<'_, Storage> {
        self.inner.lock()
    }

    pub fn create_stream(&self, name: &str) -> Result<StreamId> {
        self.inner.lock().create_stream(name)
    }

    pub fn open_stream(&self, name: &str) -> Result<StreamId> {
        self.inner.lock().open_stream(name)
    }

    pub fn read(&self, stream: StreamId, buf: &mut [u8]) -> Result<ReadOutcome> {
        self.inner.lock().read(stream, buf)
    }

    pub fn read_exact(&self, stream: StreamId, buf: &mut [u8]) -> Result<()> {
        self.inner.lock().read_exact(stream, buf)
    }

    pub fn read_to_end(&self, stream: StreamId) -> Result<Vec<u8>> {
        self.inner.lock().read_to_end(stream)
    }

    pub fn write(&self, stream: StreamId, data: &[u8]) -> Result<()> {
        self.inner.lock().write(stream, data)
    }

    pub fn stream_seek(&self, stream: StreamId, offset: u32) -> Result<()> {
        self.inner.lock().stream_seek(stream, offset)
    }

    pub fn stream_position(&self, stream: StreamId) -> Result<u32> {
        self.inner.lock().stream_position(stream)
    }

    pub fn file_position(&self, stream: StreamId) -> Result<FilePosition> {
        self.inner.lock().file_position(stream)
    }

    pub fn file_seek(&self, stream: StreamId, pos: &FilePosition) -> Result<()> {
        self.inner.lock().file_seek(stream, pos)
    }

    pub fn stream_size(&self, stream: StreamId) -> Result<u32> {
        self.inner.lock().stream_size(stream)
    }

    pub fn streams(&self) -> Result<Vec<StreamInfo>> {
        self.inner.lock().streams()
    }

    pub fn flush(&self) -> Result<()> {
        self.inner.lock().flush()
    }

    pub fn close(&self) -> Result<()> {
        self.inner.lock().close()
    }
}
