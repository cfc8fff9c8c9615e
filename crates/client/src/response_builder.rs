//! Assembles a [`Response`] from transport callbacks.

use micro_message::Response;
use tracing::{trace, warn};

use crate::ClientError;
use crate::ensure;
use crate::transport::TransportHandler;

/// The [`TransportHandler`] behind [`HttpClient`](crate::HttpClient).
///
/// It starts from a `200` response with an empty in-memory body. Status lines update the
/// status, reason and protocol version; header lines are added to the response, appending to
/// a header that was already seen. Body chunks are written to the body stream.
///
/// The first failing line stops the transfer and is kept until [`ResponseBuilder::take_error`].
#[derive(Debug)]
pub struct ResponseBuilder {
    response: Response,
    error: Option<ClientError>,
}

impl ResponseBuilder {
    /// # Errors
    ///
    /// Never fails in practice; the initial status is valid.
    pub fn new() -> Result<Self, ClientError> {
        Ok(Self { response: Response::new(200)?, error: None })
    }

    /// Applies one response head line.
    ///
    /// Blank lines are ignored. A line starting with `HTTP/` (in any case) is a status line
    /// `HTTP/<version> <code> [reason]`; anything else must be a `name: value` header.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidHeader`] for a status line without a code, a header line
    /// without a colon, or a code, name or value the response rejects.
    pub fn header_line(&mut self, line: &str) -> Result<(), ClientError> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(());
        }

        let is_status_line = line.get(..5).is_some_and(|prefix| prefix.eq_ignore_ascii_case("http/"));
        if is_status_line {
            self.status_line(line)
        } else {
            self.header(line)
        }
    }

    fn status_line(&mut self, line: &str) -> Result<(), ClientError> {
        let parts: Vec<&str> = line.splitn(3, ' ').collect();
        ensure!(parts.len() >= 2, ClientError::invalid_header(format!("invalid status line: {line}")));

        let status = parts[1]
            .parse::<u16>()
            .map_err(|e| ClientError::invalid_header(format!("invalid status code in {line:?}: {e}")))?;
        let reason = parts.get(2).copied().unwrap_or_default();
        let version = &parts[0][5..];

        self.response = self
            .response
            .with_status(status, reason)
            .map_err(|e| ClientError::invalid_header(format!("invalid status line {line:?}: {e}")))?
            .with_protocol_version(version);

        trace!(status, version, "status line");
        Ok(())
    }

    fn header(&mut self, line: &str) -> Result<(), ClientError> {
        let (name, value) = line.split_once(':').ok_or_else(|| ClientError::invalid_header(format!("invalid header line: {line}")))?;
        let (name, value) = (name.trim(), value.trim());

        let updated = if self.response.has_header(name) {
            self.response.with_added_header(name, value)
        } else {
            self.response.with_header(name, value)
        };
        self.response = updated.map_err(|e| ClientError::invalid_header(format!("invalid header line {line:?}: {e}")))?;
        Ok(())
    }

    /// Appends a chunk to the response body.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Message`] if the body stream rejects the write.
    pub fn write_body(&mut self, chunk: &[u8]) -> Result<(), ClientError> {
        self.response.body().write(chunk)?;
        Ok(())
    }

    /// The error that stopped the transfer, if a callback failed.
    pub fn take_error(&mut self) -> Option<ClientError> {
        self.error.take()
    }

    /// Finishes the response with its body rewound to the start.
    ///
    /// # Errors
    ///
    /// Returns the error a callback recorded, or [`ClientError::Message`] if the body can't be
    /// rewound.
    pub fn into_response(mut self) -> Result<Response, ClientError> {
        if let Some(error) = self.error.take() {
            return Err(error);
        }
        self.response.body().rewind()?;
        Ok(self.response)
    }

    fn record(&mut self, result: Result<(), ClientError>) -> bool {
        match result {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "stopping transfer");
                self.error = Some(e);
                false
            }
        }
    }
}

impl TransportHandler for ResponseBuilder {
    fn on_header(&mut self, line: &[u8]) -> bool {
        let result = self.header_line(&String::from_utf8_lossy(line));
        self.record(result)
    }

    fn on_body(&mut self, chunk: &[u8]) -> bool {
        let result = self.write_body(chunk);
        self.record(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_line() {
        let mut builder = ResponseBuilder::new().unwrap();
        builder.header_line("HTTP/1.0 404 Not Found\r\n").unwrap();

        let response = builder.into_response().unwrap();
        assert_eq!(response.status(), 404);
        assert_eq!(response.reason(), "Not Found");
        assert_eq!(response.version(), "1.0");
    }

    #[test]
    fn test_status_line_without_reason() {
        let mut builder = ResponseBuilder::new().unwrap();
        builder.header_line("http/2 204").unwrap();

        let response = builder.into_response().unwrap();
        assert_eq!(response.status(), 204);
        assert_eq!(response.reason(), "No Content");
        assert_eq!(response.version(), "2");
    }

    #[test]
    fn test_custom_reason() {
        let mut builder = ResponseBuilder::new().unwrap();
        builder.header_line("HTTP/1.1 200 Everything Fine").unwrap();
        assert_eq!(builder.into_response().unwrap().reason(), "Everything Fine");
    }

    #[test]
    fn test_header_line() {
        let mut builder = ResponseBuilder::new().unwrap();
        builder.header_line("htestkey:htestvalue").unwrap();

        let response = builder.into_response().unwrap();
        assert_eq!(response.header_line("htestkey"), "htestvalue");
    }

    #[test]
    fn test_repeated_header_appends() {
        let mut builder = ResponseBuilder::new().unwrap();
        builder.header_line("htestkey: value1").unwrap();
        builder.header_line("HTestKey: value2").unwrap();

        let response = builder.into_response().unwrap();
        assert_eq!(response.header_line("htestkey"), "value1, value2");
    }

    #[test]
    fn test_value_keeps_later_colons() {
        let mut builder = ResponseBuilder::new().unwrap();
        builder.header_line("Location: http://example.com:8080/next").unwrap();
        assert_eq!(builder.into_response().unwrap().header_line("location"), "http://example.com:8080/next");
    }

    #[test]
    fn test_blank_line_ignored() {
        let mut builder = ResponseBuilder::new().unwrap();
        builder.header_line("\r\n").unwrap();
        builder.header_line("   ").unwrap();
        assert!(builder.into_response().unwrap().headers().is_empty());
    }

    #[test]
    fn test_invalid_lines() {
        let mut builder = ResponseBuilder::new().unwrap();
        assert!(builder.header_line("data").unwrap_err().is_invalid_header());
        assert!(builder.header_line("http/").unwrap_err().is_invalid_header());
        assert!(builder.header_line("HTTP/1.1 abc").unwrap_err().is_invalid_header());
        assert!(builder.header_line("HTTP/1.1 700 Nope").unwrap_err().is_invalid_header());
        assert!(builder.header_line(": no name").unwrap_err().is_invalid_header());
    }

    #[test]
    fn test_callbacks_record_first_error() {
        let mut builder = ResponseBuilder::new().unwrap();
        assert!(builder.on_header(b"HTTP/1.1 201 Created"));
        assert!(builder.on_body(b"hello "));
        assert!(builder.on_body(b"world"));
        assert!(!builder.on_header(b"garbage"));

        assert!(builder.take_error().unwrap().is_invalid_header());
        assert!(builder.take_error().is_none());

        let response = builder.into_response().unwrap();
        assert_eq!(response.status(), 201);
        assert_eq!(&response.body().contents().unwrap()[..], b"hello world");
    }

    #[test]
    fn test_into_response_returns_recorded_error() {
        let mut builder = ResponseBuilder::new().unwrap();
        assert!(!builder.on_header(b"nonsense"));
        assert!(builder.into_response().is_err());
    }

    #[test]
    fn test_body_is_rewound() {
        let mut builder = ResponseBuilder::new().unwrap();
        builder.write_body(b"payload").unwrap();

        let response = builder.into_response().unwrap();
        assert_eq!(response.body().tell().unwrap(), 0);
        assert_eq!(&response.body().read(3).unwrap()[..], b"pay");
    }
}
