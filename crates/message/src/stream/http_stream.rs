use std::fmt::{self, Debug, Formatter};
use std::fs::File;
use std::io::{Cursor, Read, Seek, SeekFrom, Write};

use bytes::Bytes;
use tracing::trace;

use super::OpenMode;
use crate::{MessageError, ensure};

/// The resource behind an [`HttpStream`].
pub enum StreamResource {
    /// A growable in-memory buffer, always readable, writable and seekable.
    Memory(Cursor<Vec<u8>>),
    /// An open file, with flags taken from the mode it was opened with.
    File(File),
    /// A read-only, forward-only resource.
    Reader(Box<dyn Read + Send>),
}

impl Debug for StreamResource {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Memory(cursor) => f.debug_struct("Memory").field("len", &cursor.get_ref().len()).field("position", &cursor.position()).finish(),
            Self::File(file) => f.debug_tuple("File").field(file).finish(),
            Self::Reader(_) => f.write_str("Reader"),
        }
    }
}

/// A byte stream over a [`StreamResource`].
#[derive(Debug)]
pub struct HttpStream {
    resource: Option<StreamResource>,
    size: Option<u64>,
    readable: bool,
    writable: bool,
    seekable: bool,
    /// bytes consumed from a `Reader` resource, which has no position of its own
    consumed: u64,
    reader_eof: bool,
    media_type: Option<String>,
    file_name: Option<String>,
}

impl HttpStream {
    pub fn memory(content: Vec<u8>) -> Self {
        Self::with_flags(StreamResource::Memory(Cursor::new(content)), true, true, true)
    }

    /// Wraps a file opened with `mode`.
    pub fn file(file: File, mode: OpenMode) -> Self {
        Self::with_flags(StreamResource::File(file), mode.is_readable(), mode.is_writable(), true)
    }

    pub fn reader<R: Read + Send + 'static>(reader: R) -> Self {
        Self::with_flags(StreamResource::Reader(Box::new(reader)), true, false, false)
    }

    fn with_flags(resource: StreamResource, readable: bool, writable: bool, seekable: bool) -> Self {
        Self {
            resource: Some(resource),
            size: None,
            readable,
            writable,
            seekable,
            consumed: 0,
            reader_eof: false,
            media_type: None,
            file_name: None,
        }
    }

    /// Sets a known size, used by [`HttpStream::size`] instead of asking the resource.
    #[must_use]
    pub fn with_size_hint(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    #[must_use]
    pub fn with_media_type(mut self, media_type: Option<String>) -> Self {
        self.media_type = media_type;
        self
    }

    #[must_use]
    pub fn with_file_name(mut self, file_name: Option<String>) -> Self {
        self.file_name = file_name;
        self
    }

    pub fn media_type(&self) -> Option<&str> {
        self.media_type.as_deref()
    }

    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    pub fn is_readable(&self) -> bool {
        self.readable
    }

    pub fn is_writable(&self) -> bool {
        self.writable
    }

    pub fn is_seekable(&self) -> bool {
        self.seekable
    }

    pub fn is_detached(&self) -> bool {
        self.resource.is_none()
    }

    /// Returns the size in bytes, or `None` if it can't be determined.
    ///
    /// The size is computed once from the resource and cached until the next write.
    pub fn size(&mut self) -> Option<u64> {
        if self.size.is_some() {
            return self.size;
        }

        self.size = match self.resource.as_ref()? {
            StreamResource::Memory(cursor) => Some(cursor.get_ref().len() as u64),
            StreamResource::File(file) => file.metadata().ok().map(|metadata| metadata.len()),
            StreamResource::Reader(_) => None,
        };
        self.size
    }

    /// Reads up to `length` bytes, fewer only when the end of the stream is reached.
    ///
    /// # Errors
    ///
    /// Returns [`MessageError::InvalidState`] if the stream is detached or not readable, and
    /// [`MessageError::Io`] if the resource fails.
    pub fn read(&mut self, length: usize) -> Result<Bytes, MessageError> {
        self.check_readable()?;
        if length == 0 {
            return Ok(Bytes::new());
        }

        let mut buf = Vec::with_capacity(length.min(64 * 1024));
        let read = self.resource_reader()?.take(length as u64).read_to_end(&mut buf)?;
        self.after_read(read, read < length);
        Ok(Bytes::from(buf))
    }

    /// Reads everything from the current position to the end, without rewinding.
    pub fn remaining(&mut self) -> Result<Bytes, MessageError> {
        self.check_readable()?;

        let mut buf = Vec::new();
        let read = self.resource_reader()?.read_to_end(&mut buf)?;
        self.after_read(read, true);
        Ok(Bytes::from(buf))
    }

    /// Reads everything from the current position to the end, then rewinds if the stream is
    /// seekable.
    pub fn contents(&mut self) -> Result<Bytes, MessageError> {
        let contents = self.remaining()?;
        if self.seekable {
            self.rewind()?;
        }
        Ok(contents)
    }

    /// Returns the whole content from position 0, leaving the stream rewound. Non-seekable
    /// streams return what is left.
    pub fn to_bytes(&mut self) -> Result<Bytes, MessageError> {
        if self.seekable {
            self.rewind()?;
        }
        self.contents()
    }

    /// Writes all of `data` at the current position and returns the number of bytes written.
    ///
    /// # Errors
    ///
    /// Returns [`MessageError::InvalidState`] if the stream is detached or not writable.
    pub fn write(&mut self, data: &[u8]) -> Result<usize, MessageError> {
        self.check_attached()?;
        ensure!(self.writable, MessageError::invalid_state("cannot write to a non-writable stream"));

        // the size is unknown after writing anything
        self.size = None;
        match self.resource.as_mut() {
            Some(StreamResource::Memory(cursor)) => cursor.write_all(data)?,
            Some(StreamResource::File(file)) => file.write_all(data)?,
            _ => return Err(MessageError::invalid_state("cannot write to a non-writable stream")),
        }
        Ok(data.len())
    }

    /// Moves the position, returning the new one.
    ///
    /// # Errors
    ///
    /// Returns [`MessageError::InvalidState`] if the stream is detached, not seekable, or the
    /// target position lies outside the stream.
    pub fn seek(&mut self, pos: SeekFrom) -> Result<u64, MessageError> {
        self.check_attached()?;
        ensure!(self.seekable, MessageError::invalid_state("stream is not seekable"));

        let out_of_range = || MessageError::invalid_state(format!("unable to seek to stream position {pos:?}"));
        let position = match self.resource.as_mut() {
            Some(StreamResource::Memory(cursor)) => {
                let len = cursor.get_ref().len() as u64;
                let target = match pos {
                    SeekFrom::Start(offset) => Some(offset),
                    SeekFrom::Current(offset) => cursor.position().checked_add_signed(offset),
                    SeekFrom::End(offset) => len.checked_add_signed(offset),
                };
                let target = target.filter(|target| *target <= len).ok_or_else(out_of_range)?;
                cursor.set_position(target);
                target
            }
            Some(StreamResource::File(file)) => file.seek(pos).map_err(|e| MessageError::invalid_state(format!("unable to seek to stream position {pos:?}: {e}")))?,
            _ => return Err(out_of_range()),
        };

        trace!(position, "seeked stream");
        Ok(position)
    }

    pub fn rewind(&mut self) -> Result<(), MessageError> {
        self.seek(SeekFrom::Start(0)).map(|_| ())
    }

    /// Returns the current position.
    pub fn tell(&mut self) -> Result<u64, MessageError> {
        match self.resource.as_mut() {
            None => Err(detached()),
            Some(StreamResource::Memory(cursor)) => Ok(cursor.position()),
            Some(StreamResource::File(file)) => Ok(file.stream_position()?),
            Some(StreamResource::Reader(_)) => Ok(self.consumed),
        }
    }

    /// Whether the position is at the end of the stream.
    pub fn eof(&mut self) -> Result<bool, MessageError> {
        match self.resource.as_mut() {
            None => Err(detached()),
            Some(StreamResource::Memory(cursor)) => Ok(cursor.position() >= cursor.get_ref().len() as u64),
            Some(StreamResource::File(file)) => {
                let position = file.stream_position()?;
                Ok(position >= file.metadata()?.len())
            }
            Some(StreamResource::Reader(_)) => Ok(self.reader_eof),
        }
    }

    /// Separates the resource from the stream, leaving the stream unusable.
    pub fn detach(&mut self) -> Option<StreamResource> {
        let resource = self.resource.take();
        self.size = None;
        self.readable = false;
        self.writable = false;
        self.seekable = false;
        resource
    }

    /// Closes the resource, flushing files, and detaches the stream.
    pub fn close(&mut self) {
        if let Some(StreamResource::File(mut file)) = self.detach() {
            // nothing to report to on close
            let _ = file.flush();
        }
    }

    fn check_attached(&self) -> Result<(), MessageError> {
        ensure!(self.resource.is_some(), detached());
        Ok(())
    }

    fn check_readable(&self) -> Result<(), MessageError> {
        self.check_attached()?;
        ensure!(self.readable, MessageError::invalid_state("cannot read from non-readable stream"));
        Ok(())
    }

    fn resource_reader(&mut self) -> Result<&mut dyn Read, MessageError> {
        match self.resource.as_mut() {
            None => Err(detached()),
            Some(StreamResource::Memory(cursor)) => Ok(cursor),
            Some(StreamResource::File(file)) => Ok(file),
            Some(StreamResource::Reader(reader)) => Ok(reader),
        }
    }

    fn after_read(&mut self, read: usize, hit_end: bool) {
        if matches!(self.resource, Some(StreamResource::Reader(_))) {
            self.consumed += read as u64;
            self.reader_eof |= hit_end;
        }
    }
}

fn detached() -> MessageError {
    MessageError::invalid_state("stream is detached")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn content_stream() -> HttpStream {
        HttpStream::memory(b"thisIsContent".to_vec())
    }

    #[test]
    fn common_operations() {
        let mut stream = content_stream();

        assert_eq!(stream.size(), Some(13));
        assert!(stream.is_readable());
        assert!(stream.is_writable());
        assert!(stream.is_seekable());
        assert_eq!(&stream.read(4).unwrap()[..], b"this");
        assert_eq!(&stream.contents().unwrap()[..], b"IsContent");
        assert_eq!(stream.write(b"newContent").unwrap(), 10);
        assert_eq!(stream.tell().unwrap(), 10);
        assert_eq!(&stream.to_bytes().unwrap()[..], b"newContentent");
    }

    #[test]
    fn contents_and_eof() {
        let mut stream = content_stream();
        stream.contents().unwrap();

        assert_eq!(&stream.remaining().unwrap()[..], b"thisIsContent");
        assert!(stream.eof().unwrap());

        stream.rewind().unwrap();
        assert!(!stream.eof().unwrap());
        assert_eq!(&stream.contents().unwrap()[..], b"thisIsContent");
    }

    #[test]
    fn read_zero_and_past_end() {
        let mut stream = content_stream();
        assert!(stream.read(0).unwrap().is_empty());
        assert_eq!(stream.read(100).unwrap().len(), 13);
        assert!(stream.read(10).unwrap().is_empty());
    }

    #[test]
    fn size_hint_and_write_invalidation() {
        let mut stream = content_stream().with_size_hint(99);
        assert_eq!(stream.size(), Some(99));

        stream.seek(SeekFrom::End(0)).unwrap();
        stream.write(b"!").unwrap();
        assert_eq!(stream.size(), Some(14));
    }

    #[test]
    fn seek_out_of_range() {
        let mut stream = content_stream();
        assert!(stream.seek(SeekFrom::Start(14)).unwrap_err().is_invalid_state());
        assert!(stream.seek(SeekFrom::Current(-1)).unwrap_err().is_invalid_state());
        assert_eq!(stream.seek(SeekFrom::End(-3)).unwrap(), 10);
        assert_eq!(&stream.remaining().unwrap()[..], b"ent");
    }

    #[test]
    fn detached_stream_is_unusable() {
        let mut stream = content_stream();
        assert!(stream.detach().is_some());

        assert!(stream.is_detached());
        assert_eq!(stream.size(), None);
        assert!(!stream.is_readable());
        assert!(stream.tell().unwrap_err().is_invalid_state());
        assert!(stream.read(1).unwrap_err().is_invalid_state());
        assert!(stream.write(b"x").unwrap_err().is_invalid_state());
        assert!(stream.eof().unwrap_err().is_invalid_state());
        assert!(stream.detach().is_none());
    }

    #[test]
    fn reader_is_forward_only() {
        let mut stream = HttpStream::reader(&b"abcdef"[..]);

        assert!(!stream.is_seekable());
        assert!(!stream.is_writable());
        assert_eq!(stream.size(), None);
        assert_eq!(&stream.read(2).unwrap()[..], b"ab");
        assert_eq!(stream.tell().unwrap(), 2);
        assert!(!stream.eof().unwrap());
        assert_eq!(&stream.contents().unwrap()[..], b"cdef");
        assert!(stream.eof().unwrap());
        assert!(stream.rewind().unwrap_err().is_invalid_state());
        assert!(stream.write(b"x").unwrap_err().is_invalid_state());
    }
}
