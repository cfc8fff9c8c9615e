//! Response head parsing.
//!
//! [`ResponseHeadDecoder`] turns the bytes up to the blank line into a [`ResponseHead`] using
//! `httparse`, enforcing a limit on the head size and on the number of headers. The head then
//! decides how the body is framed, following
//! [RFC 9112 Section 6.3](https://www.rfc-editor.org/rfc/rfc9112#section-6.3).

use bytes::{Buf, BytesMut};
use httparse::Status;
use tokio_util::codec::Decoder;
use tracing::trace;

use super::PayloadDecoder;
use crate::ensure;
use crate::transport::TransportError;

pub const DEFAULT_MAX_HEADERS: usize = 64;

pub const DEFAULT_MAX_HEADER_BYTES: usize = 16 * 1024;

/// A parsed status line and its headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseHead {
    /// minor version, `HTTP/1.<version>`
    pub version: u8,
    pub status: u16,
    pub reason: String,
    pub headers: Vec<(String, String)>,
}

impl ResponseHead {
    /// `HTTP/1.1 200 OK`, as a header callback receives it.
    pub fn status_line(&self) -> String {
        if self.reason.is_empty() {
            format!("HTTP/1.{} {}", self.version, self.status)
        } else {
            format!("HTTP/1.{} {} {}", self.version, self.status, self.reason)
        }
    }

    /// Interim `1xx` responses are followed by another head; `101` is final.
    pub fn is_interim(&self) -> bool {
        (100..200).contains(&self.status) && self.status != 101
    }

    fn header(&self, name: &str) -> impl Iterator<Item = &str> {
        self.headers.iter().filter(move |(n, _)| n.eq_ignore_ascii_case(name)).map(|(_, v)| v.as_str())
    }

    /// Chooses the body decoder for this response.
    ///
    /// # Arguments
    ///
    /// * `head_request` - the response answers a `HEAD` request and has no body
    ///
    /// # Errors
    ///
    /// Returns [`TransportErrorKind::WeirdServerReply`](crate::transport::TransportErrorKind)
    /// for an unparseable or conflicting `Content-Length`.
    pub fn payload_decoder(&self, head_request: bool) -> Result<PayloadDecoder, TransportError> {
        if head_request || (100..200).contains(&self.status) || self.status == 204 || self.status == 304 {
            return Ok(PayloadDecoder::empty());
        }

        if let Some(encoding) = self.header("transfer-encoding").last() {
            let chunked = encoding.rsplit(',').next().is_some_and(|coding| coding.trim().eq_ignore_ascii_case("chunked"));
            return Ok(if chunked { PayloadDecoder::chunked() } else { PayloadDecoder::until_close() });
        }

        let mut length: Option<u64> = None;
        for value in self.header("content-length") {
            for item in value.split(',') {
                let parsed = item
                    .trim()
                    .parse::<u64>()
                    .map_err(|e| TransportError::weird_server_reply(format!("invalid content-length {item:?}: {e}")))?;
                ensure!(
                    length.is_none_or(|known| known == parsed),
                    TransportError::weird_server_reply("conflicting content-length values")
                );
                length = Some(parsed);
            }
        }

        Ok(length.map_or_else(PayloadDecoder::until_close, PayloadDecoder::fix_length))
    }
}

/// Decodes one response head.
#[derive(Debug, Clone, Copy)]
pub struct ResponseHeadDecoder {
    max_headers: usize,
    max_header_bytes: usize,
}

impl ResponseHeadDecoder {
    pub fn new(max_headers: usize, max_header_bytes: usize) -> Self {
        Self { max_headers, max_header_bytes }
    }
}

impl Default for ResponseHeadDecoder {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_HEADERS, DEFAULT_MAX_HEADER_BYTES)
    }
}

impl Decoder for ResponseHeadDecoder {
    type Item = ResponseHead;
    type Error = TransportError;

    /// Parses a complete head and removes it from `src`.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(head))` once the blank line ending the head is buffered
    /// - `Ok(None)` when more bytes are needed
    ///
    /// # Errors
    ///
    /// Returns a weird-server-reply error for a malformed head, more than `max_headers`
    /// headers, or a head longer than `max_header_bytes`.
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.is_empty() {
            return Ok(None);
        }

        let mut headers = vec![httparse::EMPTY_HEADER; self.max_headers];
        let mut response = httparse::Response::new(&mut headers);

        let status = response.parse(src).map_err(|e| match e {
            httparse::Error::TooManyHeaders => {
                TransportError::weird_server_reply(format!("response has more than {} headers", self.max_headers))
            }
            e => TransportError::weird_server_reply(format!("invalid response head: {e}")),
        })?;

        match status {
            Status::Complete(offset) => {
                ensure!(
                    offset <= self.max_header_bytes,
                    TransportError::weird_server_reply(format!("response head of {offset} bytes exceeds {}", self.max_header_bytes))
                );

                let head = ResponseHead {
                    version: response.version.unwrap_or(1),
                    status: response.code.unwrap_or_default(),
                    reason: response.reason.unwrap_or_default().to_string(),
                    headers: response
                        .headers
                        .iter()
                        .map(|header| (header.name.to_string(), String::from_utf8_lossy(header.value).into_owned()))
                        .collect(),
                };
                src.advance(offset);

                trace!(status = head.status, headers = head.headers.len(), "parsed response head");
                Ok(Some(head))
            }
            Status::Partial => {
                ensure!(
                    src.len() <= self.max_header_bytes,
                    TransportError::weird_server_reply(format!("response head exceeds {} bytes", self.max_header_bytes))
                );
                Ok(None)
            }
        }
    }
}
