//! Uploaded files attached to multipart requests.
//!
//! An [`UploadedFile`] is either backed by a file path (moved by renaming) or by a stream
//! (moved by copying in [`COPY_BUFFER_SIZE`] chunks). Its stream can only be used while the
//! upload is [`UploadError::Ok`] and it can be moved at most once.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, warn};

use crate::stream::{SharedStream, factory};
use crate::{MessageError, ensure};

/// Chunk size used when moving a stream-backed upload.
pub const COPY_BUFFER_SIZE: usize = 8192;

/// Upload status codes, numbered like the classic form-upload error constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UploadError {
    #[default]
    Ok = 0,
    IniSize = 1,
    FormSize = 2,
    Partial = 3,
    NoFile = 4,
    NoTmpDir = 6,
    CantWrite = 7,
    Extension = 8,
}

impl TryFrom<i32> for UploadError {
    type Error = MessageError;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        Ok(match code {
            0 => Self::Ok,
            1 => Self::IniSize,
            2 => Self::FormSize,
            3 => Self::Partial,
            4 => Self::NoFile,
            6 => Self::NoTmpDir,
            7 => Self::CantWrite,
            8 => Self::Extension,
            _ => return Err(MessageError::invalid_argument(format!("invalid error status for uploaded file: {code}"))),
        })
    }
}

#[derive(Debug)]
enum Source {
    Path(PathBuf),
    Stream(SharedStream),
}

/// A file received for, or to be sent in, a multipart request.
#[derive(Debug)]
pub struct UploadedFile {
    source: Option<Source>,
    size: Option<u64>,
    error: UploadError,
    client_filename: Option<String>,
    client_media_type: Option<String>,
    moved: AtomicBool,
}

impl UploadedFile {
    /// Creates an upload backed by an existing file.
    ///
    /// Size, client filename and client media type default from the file.
    ///
    /// # Errors
    ///
    /// Returns [`MessageError::InvalidArgument`] if the path is not an existing file.
    pub fn from_path(path: impl Into<PathBuf>) -> Result<Self, MessageError> {
        let path = path.into();
        let metadata = fs::metadata(&path)
            .ok()
            .filter(fs::Metadata::is_file)
            .ok_or_else(|| MessageError::invalid_argument(format!("invalid file provided for uploaded file: {}", path.display())))?;

        Ok(Self {
            size: Some(metadata.len()),
            client_filename: Some(path.display().to_string()),
            client_media_type: Some(factory::guess_media_type(&path).to_string()),
            source: Some(Source::Path(path)),
            error: UploadError::Ok,
            moved: AtomicBool::new(false),
        })
    }

    /// Creates an upload backed by a stream; size, filename and media type default from the
    /// stream's tags.
    pub fn from_stream(stream: SharedStream) -> Self {
        Self {
            size: stream.size(),
            client_filename: stream.file_name(),
            client_media_type: stream.media_type(),
            source: Some(Source::Stream(stream)),
            error: UploadError::Ok,
            moved: AtomicBool::new(false),
        }
    }

    /// Creates an upload that failed with `error`; it has no usable source.
    pub fn failed(error: UploadError, size: Option<u64>) -> Self {
        Self {
            source: None,
            size,
            error,
            client_filename: None,
            client_media_type: None,
            moved: AtomicBool::new(false),
        }
    }

    /// Overrides the client filename.
    #[must_use]
    pub fn with_client_filename(mut self, filename: impl Into<String>) -> Self {
        self.client_filename = Some(filename.into());
        self
    }

    /// Overrides the client media type.
    #[must_use]
    pub fn with_client_media_type(mut self, media_type: impl Into<String>) -> Self {
        self.client_media_type = Some(media_type.into());
        self
    }

    /// Overrides the declared size.
    #[must_use]
    pub fn with_size(mut self, size: Option<u64>) -> Self {
        self.size = size;
        self
    }

    pub fn size(&self) -> Option<u64> {
        self.size
    }

    pub fn error(&self) -> UploadError {
        self.error
    }

    pub fn client_filename(&self) -> Option<&str> {
        self.client_filename.as_deref()
    }

    pub fn client_media_type(&self) -> Option<&str> {
        self.client_media_type.as_deref()
    }

    pub fn is_moved(&self) -> bool {
        self.moved.load(Ordering::Acquire)
    }

    /// Returns the upload's stream, opening path-backed files read/write.
    ///
    /// # Errors
    ///
    /// Returns [`MessageError::InvalidState`] if the upload failed or was already moved.
    pub fn stream(&self) -> Result<SharedStream, MessageError> {
        self.validate_active()?;

        match &self.source {
            Some(Source::Stream(stream)) => Ok(stream.clone()),
            Some(Source::Path(path)) => factory::create_stream_from_file(path, "r+"),
            None => Err(MessageError::invalid_state("uploaded file has no source")),
        }
    }

    /// Moves the upload to `target`, by renaming a path-backed file or by copying a stream.
    ///
    /// # Errors
    ///
    /// - [`MessageError::InvalidState`] if the upload failed or was already moved
    /// - [`MessageError::InvalidArgument`] if `target` is empty
    /// - [`MessageError::Io`] if the rename or the copy fails
    pub fn move_to(&self, target: impl AsRef<Path>) -> Result<(), MessageError> {
        let target = target.as_ref();
        self.validate_active()?;
        ensure!(
            !target.as_os_str().is_empty(),
            MessageError::invalid_argument("invalid path provided for move operation, must be a non-empty path")
        );

        match &self.source {
            Some(Source::Path(path)) => fs::rename(path, target).inspect_err(|e| warn!(cause = %e, target = %target.display(), "uploaded file could not be moved"))?,
            Some(Source::Stream(stream)) => {
                let dest = factory::create_stream_from_file(target, "w")?;
                copy_stream(stream, &dest)?;
                dest.close();
            }
            None => return Err(MessageError::invalid_state("uploaded file has no source")),
        }

        debug!(target = %target.display(), "moved uploaded file");
        self.moved.store(true, Ordering::Release);
        Ok(())
    }

    fn validate_active(&self) -> Result<(), MessageError> {
        ensure!(self.error == UploadError::Ok, MessageError::invalid_state("cannot retrieve stream due to upload error"));
        ensure!(!self.is_moved(), MessageError::invalid_state("cannot retrieve stream after it has already been moved"));
        Ok(())
    }
}

fn copy_stream(source: &SharedStream, dest: &SharedStream) -> Result<(), MessageError> {
    while !source.eof()? {
        let chunk = source.read(COPY_BUFFER_SIZE)?;
        if chunk.is_empty() || dest.write(&chunk)? == 0 {
            break;
        }
    }
    Ok(())
}

/// One slot of a request's uploaded-file map: a file or a (possibly nested) list of files.
///
/// Lists are serialized as `name[]` parts. Nested lists are rejected when the body is built.
#[derive(Debug, Clone)]
pub enum UploadedFileEntry {
    Single(Arc<UploadedFile>),
    List(Vec<UploadedFileEntry>),
}

impl From<UploadedFile> for UploadedFileEntry {
    fn from(file: UploadedFile) -> Self {
        Self::Single(Arc::new(file))
    }
}

impl From<Arc<UploadedFile>> for UploadedFileEntry {
    fn from(file: Arc<UploadedFile>) -> Self {
        Self::Single(file)
    }
}

impl From<Vec<UploadedFile>> for UploadedFileEntry {
    fn from(files: Vec<UploadedFile>) -> Self {
        Self::List(files.into_iter().map(Self::from).collect())
    }
}
