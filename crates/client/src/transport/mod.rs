//! The seam between [`HttpClient`](crate::HttpClient) and the engine that moves bytes.
//!
//! The client never talks to a socket. It translates a [`Request`](micro_message::Request)
//! into [`TransportOptions`], hands them to a [`Transport`] together with a
//! [`TransportHandler`], and builds the response from the callbacks it receives:
//!
//! - every response head line (status line first, then one call per header) goes to
//!   [`TransportHandler::on_header`]
//! - every decoded body chunk goes to [`TransportHandler::on_body`]
//!
//! A handler returning `false` aborts the transfer; the transport then fails with
//! [`TransportErrorKind::Aborted`].
//!
//! [`TcpTransport`] is the default engine: blocking HTTP/1.x over `std::net::TcpStream`.

mod error;
mod tcp;

pub use error::{TransportError, TransportErrorKind};
pub use tcp::TcpTransport;

use std::time::Duration;

use bytes::Bytes;
use micro_message::SharedStream;

/// The protocol version a transfer should use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HttpVersion {
    /// let the transport decide
    #[default]
    None,
    Http10,
    Http11,
    Http2,
}

/// How the request method is sent.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TransportMethod {
    #[default]
    Get,
    /// `HEAD`: no response body is read
    Head,
    /// any other method, sent verbatim
    Custom(String),
}

impl TransportMethod {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Get => "GET",
            Self::Head => "HEAD",
            Self::Custom(method) => method,
        }
    }
}

/// The request body handed to the transport.
#[derive(Debug, Clone, Default)]
pub enum TransportBody {
    #[default]
    None,
    /// a fully materialized body, sent in one piece
    Fields(Bytes),
    /// a body read from `source` while it is sent; `size` is `None` when unknown
    Upload { size: Option<u64>, source: SharedStream },
}

impl TransportBody {
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    pub fn is_upload(&self) -> bool {
        matches!(self, Self::Upload { .. })
    }
}

/// Everything a transport needs for one transfer.
#[derive(Debug, Clone, Default)]
pub struct TransportOptions {
    pub url: String,
    pub version: HttpVersion,
    /// the raw `user[:password]` user info of the url
    pub credentials: Option<String>,
    pub method: TransportMethod,
    pub body: TransportBody,
    /// complete `Name: value` lines; a line with an empty value removes that header
    pub headers: Vec<String>,
    pub connect_timeout: Option<Duration>,
    pub timeout: Option<Duration>,
}

/// Receives the response while a transport runs.
pub trait TransportHandler {
    /// Called with each response head line, without the trailing CRLF.
    ///
    /// Returns `false` to abort the transfer.
    fn on_header(&mut self, line: &[u8]) -> bool;

    /// Called with each chunk of the decoded response body.
    ///
    /// Returns `false` to abort the transfer.
    fn on_body(&mut self, chunk: &[u8]) -> bool;
}

/// A blocking HTTP engine.
///
/// One transport runs one transfer at a time. [`HttpClient`](crate::HttpClient) keeps a single
/// instance and calls [`Transport::reset`] before every transfer instead of creating a new one.
pub trait Transport {
    /// Whether [`HttpVersion::Http2`] can be requested.
    fn supports_http2(&self) -> bool {
        false
    }

    /// Clears any state left by the previous transfer.
    fn reset(&mut self);

    /// Runs one transfer, reporting the response to `handler`.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] whose [`kind`](TransportError::kind) tells network
    /// failures apart from everything else.
    fn perform(&mut self, options: &TransportOptions, handler: &mut dyn TransportHandler) -> Result<(), TransportError>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn supports_http2(&self) -> bool {
        (**self).supports_http2()
    }

    fn reset(&mut self) {
        (**self).reset();
    }

    fn perform(&mut self, options: &TransportOptions, handler: &mut dyn TransportHandler) -> Result<(), TransportError> {
        (**self).perform(options, handler)
    }
}
