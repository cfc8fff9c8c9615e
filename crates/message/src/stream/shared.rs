use std::io::SeekFrom;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bytes::Bytes;

use super::HttpStream;
use crate::MessageError;

/// A cloneable handle to one [`HttpStream`].
///
/// Clones share the resource and its position, the way a message and its `with_*` copies
/// share a body. Two handles are equal when they point at the same stream.
#[derive(Debug, Clone)]
pub struct SharedStream {
    inner: Arc<Mutex<HttpStream>>,
}

impl SharedStream {
    pub fn new(stream: HttpStream) -> Self {
        Self { inner: Arc::new(Mutex::new(stream)) }
    }

    /// An empty, writable in-memory stream.
    pub fn empty() -> Self {
        Self::new(HttpStream::memory(Vec::new()))
    }

    fn lock(&self) -> MutexGuard<'_, HttpStream> {
        // a panic while holding the lock leaves the stream itself intact
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs `f` with exclusive access to the stream.
    pub fn with<R>(&self, f: impl FnOnce(&mut HttpStream) -> R) -> R {
        f(&mut self.lock())
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn size(&self) -> Option<u64> {
        self.lock().size()
    }

    pub fn is_readable(&self) -> bool {
        self.lock().is_readable()
    }

    pub fn is_writable(&self) -> bool {
        self.lock().is_writable()
    }

    pub fn is_seekable(&self) -> bool {
        self.lock().is_seekable()
    }

    pub fn media_type(&self) -> Option<String> {
        self.lock().media_type().map(str::to_string)
    }

    pub fn file_name(&self) -> Option<String> {
        self.lock().file_name().map(str::to_string)
    }

    /// See [`HttpStream::read`].
    pub fn read(&self, length: usize) -> Result<Bytes, MessageError> {
        self.lock().read(length)
    }

    /// See [`HttpStream::write`].
    pub fn write(&self, data: &[u8]) -> Result<usize, MessageError> {
        self.lock().write(data)
    }

    pub fn seek(&self, pos: SeekFrom) -> Result<u64, MessageError> {
        self.lock().seek(pos)
    }

    pub fn rewind(&self) -> Result<(), MessageError> {
        self.lock().rewind()
    }

    pub fn tell(&self) -> Result<u64, MessageError> {
        self.lock().tell()
    }

    pub fn eof(&self) -> Result<bool, MessageError> {
        self.lock().eof()
    }

    /// See [`HttpStream::contents`].
    pub fn contents(&self) -> Result<Bytes, MessageError> {
        self.lock().contents()
    }

    pub fn remaining(&self) -> Result<Bytes, MessageError> {
        self.lock().remaining()
    }

    /// See [`HttpStream::to_bytes`].
    pub fn to_bytes(&self) -> Result<Bytes, MessageError> {
        self.lock().to_bytes()
    }

    pub fn detach(&self) -> Option<super::StreamResource> {
        self.lock().detach()
    }

    pub fn close(&self) {
        self.lock().close();
    }
}

impl PartialEq for SharedStream {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl From<HttpStream> for SharedStream {
    fn from(stream: HttpStream) -> Self {
        Self::new(stream)
    }
}

impl Default for SharedStream {
    fn default() -> Self {
        Self::empty()
    }
}
