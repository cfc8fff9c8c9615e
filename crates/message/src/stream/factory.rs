//! Stream constructors.

use std::io::Read;
use std::path::Path;

use tracing::debug;

use super::{HttpStream, OpenMode, SharedStream};
use crate::MessageError;

/// Creates a readable, writable, seekable in-memory stream positioned at 0.
pub fn create_stream(content: impl Into<Vec<u8>>) -> SharedStream {
    SharedStream::new(HttpStream::memory(content.into()))
}

/// Opens `path` with an fopen-style `mode` (`"r"`, `"r+"`, `"w"`, ...).
///
/// The stream is tagged with the path as file name and a media type guessed from the file
/// extension.
///
/// # Errors
///
/// Returns [`MessageError::InvalidArgument`] if the mode is invalid or the file can't be
/// opened with it.
pub fn create_stream_from_file(path: impl AsRef<Path>, mode: &str) -> Result<SharedStream, MessageError> {
    let path = path.as_ref();
    let mode: OpenMode = mode.parse()?;

    let file = mode
        .to_open_options()
        .open(path)
        .map_err(|e| MessageError::invalid_argument(format!("invalid file {} to create stream: {e}", path.display())))?;

    debug!(path = %path.display(), ?mode, "opened file stream");
    let stream = HttpStream::file(file, mode)
        .with_media_type(Some(guess_media_type(path).to_string()))
        .with_file_name(Some(path.display().to_string()));
    Ok(SharedStream::new(stream))
}

/// Wraps a raw reader as a read-only, non-seekable stream of unknown size.
pub fn create_stream_from_reader<R: Read + Send + 'static>(reader: R) -> SharedStream {
    SharedStream::new(HttpStream::reader(reader))
}

/// Guesses a media type from the file extension, falling back to `application/octet-stream`.
pub fn guess_media_type(path: &Path) -> mime::Mime {
    let extension = path.extension().and_then(|ext| ext.to_str()).map(str::to_ascii_lowercase);

    match extension.as_deref() {
        Some("txt" | "text" | "log") => mime::TEXT_PLAIN,
        Some("html" | "htm") => mime::TEXT_HTML,
        Some("css") => mime::TEXT_CSS,
        Some("csv") => mime::TEXT_CSV,
        Some("xml") => mime::TEXT_XML,
        Some("js" | "mjs") => mime::TEXT_JAVASCRIPT,
        Some("json") => mime::APPLICATION_JSON,
        Some("pdf") => mime::APPLICATION_PDF,
        Some("png") => mime::IMAGE_PNG,
        Some("jpg" | "jpeg") => mime::IMAGE_JPEG,
        Some("gif") => mime::IMAGE_GIF,
        Some("bmp") => mime::IMAGE_BMP,
        Some("svg") => mime::IMAGE_SVG,
        Some("woff") => mime::FONT_WOFF,
        Some("woff2") => mime::FONT_WOFF2,
        _ => mime::APPLICATION_OCTET_STREAM,
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("micro-message-factory-{}-{name}", std::process::id()))
    }

    #[test]
    fn from_file_tags_stream() {
        let path = temp_path("tagged.txt");
        fs::write(&path, "data").unwrap();

        let stream = create_stream_from_file(&path, "r").unwrap();
        assert_eq!(stream.media_type().as_deref(), Some("text/plain"));
        assert_eq!(stream.file_name(), Some(path.display().to_string()));
        assert_eq!(stream.size(), Some(4));
        assert!(stream.write(b"hallo").unwrap_err().is_invalid_state());

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn write_only_file_is_not_readable() {
        let path = temp_path("write-only.txt");
        fs::write(&path, "data").unwrap();

        let stream = create_stream_from_file(&path, "w").unwrap();
        fs::remove_file(&path).unwrap();
        assert!(stream.read(2).unwrap_err().is_invalid_state());
    }

    #[test]
    fn missing_file() {
        let error = create_stream_from_file(temp_path("missing"), "r").unwrap_err();
        assert!(error.is_invalid_argument());
    }

    #[test]
    fn detached_file_stream() {
        let path = temp_path("detached.bin");
        fs::write(&path, [0_u8; 3]).unwrap();

        let stream = create_stream_from_file(&path, "r+").unwrap();
        assert_eq!(stream.media_type().as_deref(), Some("application/octet-stream"));
        stream.detach();
        assert!(stream.tell().unwrap_err().is_invalid_state());

        fs::remove_file(&path).unwrap();
    }
}
