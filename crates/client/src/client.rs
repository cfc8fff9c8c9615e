//! The blocking HTTP client.
//!
//! [`HttpClient::send_request`] runs one transfer per call:
//!
//! 1. a fresh [`ResponseBuilder`] with an empty body stream
//! 2. the request is translated into [`TransportOptions`]: url, protocol version, credentials,
//!    method, body and header lines
//! 3. the transport is reset and performs the transfer, calling back into the builder
//! 4. a failed transfer is classified: resolve, connect, timeout and tls failures are
//!    [`ClientError::Network`], anything else is [`ClientError::Request`]
//! 5. on success the response body is rewound, ready to be read
//!
//! # Request bodies
//!
//! `GET`, `HEAD` and `TRACE` requests never send a body, nor does any request whose body is
//! empty. Bodies of a known size up to 1 MiB are read into memory and sent in one piece;
//! larger bodies, and bodies of unknown size, are streamed from the body stream.
//!
//! # Header lines
//!
//! - `Expect` headers are dropped and an empty `Expect:` line is always sent, so the
//!   transport never waits for `100 Continue`
//! - a `Content-Length` header is rewritten to the length of a buffered body, or to `0` when
//!   there is no body; a streamed body keeps the given value

use std::time::Duration;

use http::Method;
use micro_message::{Request, Response};
use tracing::{debug, trace, warn};

use crate::ClientError;
use crate::response_builder::ResponseBuilder;
use crate::transport::{HttpVersion, TcpTransport, Transport, TransportBody, TransportMethod, TransportOptions};

/// Bodies larger than this are streamed instead of buffered.
pub const MAX_BUFFERED_BODY_SIZE: u64 = 1024 * 1024;

/// A blocking HTTP client over a [`Transport`].
///
/// The client owns one transport and reuses it for every request. It holds no lock: one
/// client serves one caller at a time, which `&mut self` on
/// [`send_request`](HttpClient::send_request) enforces.
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
///
/// use micro_client::HttpClient;
/// use micro_message::Request;
///
/// let mut client = HttpClient::builder()
///     .connect_timeout(Duration::from_secs(2))
///     .default_header("User-Agent", "micro-client")
///     .build();
///
/// let request = Request::new("GET", "http://localhost:8080/health").unwrap();
/// match client.send_request(&request) {
///     Ok(response) => println!("{} {}", response.status(), response.reason()),
///     Err(e) if e.is_network() => eprintln!("server unreachable: {e}"),
///     Err(e) => eprintln!("request failed: {e}"),
/// }
/// ```
#[derive(Debug)]
pub struct HttpClient<T = TcpTransport> {
    transport: T,
    connect_timeout: Option<Duration>,
    timeout: Option<Duration>,
    default_headers: Vec<(String, String)>,
}

impl HttpClient<TcpTransport> {
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> HttpClientBuilder<TcpTransport> {
        HttpClientBuilder::new()
    }
}

impl Default for HttpClient<TcpTransport> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Transport> HttpClient<T> {
    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Sends `request` and waits for the complete response.
    ///
    /// # Errors
    ///
    /// - [`ClientError::Network`] if the server can't be reached
    /// - [`ClientError::Request`] for any other transport failure, or for an `HTTP/2.0`
    ///   request the transport can't speak
    /// - [`ClientError::InvalidHeader`] for a response line that can't be parsed
    /// - [`ClientError::Message`] if the request body can't be produced
    pub fn send_request(&mut self, request: &Request) -> Result<Response, ClientError> {
        let mut builder = ResponseBuilder::new()?;
        let options = self.transport_options(request)?;

        self.transport.reset();
        debug!(method = %request.method(), uri = %request.uri(), "sending request");
        let result = self.transport.perform(&options, &mut builder);

        if let Some(error) = builder.take_error() {
            return Err(error);
        }

        if let Err(e) = result {
            return Err(if e.is_network() {
                warn!(error = %e, "network error");
                ClientError::network(request, e)
            } else {
                warn!(error = %e, "request error");
                ClientError::request_error(request, e)
            });
        }

        let response = builder.into_response()?;
        debug!(status = response.status(), "received response");
        Ok(response)
    }

    /// Translates `request` into the options of one transfer.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Request`] for an unsupported protocol version and
    /// [`ClientError::Message`] if the body can't be produced.
    pub fn transport_options(&self, request: &Request) -> Result<TransportOptions, ClientError> {
        let version = self.transport_version(request)?;
        let (method, body) = transport_body(request)?;
        let headers = header_lines(request, &body, &self.default_headers);

        let user_info = request.uri().user_info();
        let options = TransportOptions {
            url: request.uri().to_string(),
            version,
            credentials: (!user_info.is_empty()).then(|| user_info.to_string()),
            method,
            body,
            headers,
            connect_timeout: self.connect_timeout,
            timeout: self.timeout,
        };

        trace!(url = %options.url, version = ?options.version, method = options.method.as_str(), "translated request");
        Ok(options)
    }

    fn transport_version(&self, request: &Request) -> Result<HttpVersion, ClientError> {
        match request.version() {
            "1.0" => Ok(HttpVersion::Http10),
            "1.1" => Ok(HttpVersion::Http11),
            "2.0" if self.transport.supports_http2() => Ok(HttpVersion::Http2),
            "2.0" => Err(ClientError::request_error(request, "protocol version 2.0 is not supported by the transport")),
            _ => Ok(HttpVersion::None),
        }
    }
}

/// Picks the transport method and how the body is sent.
fn transport_body(request: &Request) -> Result<(TransportMethod, TransportBody), ClientError> {
    let method = match *request.method() {
        Method::GET => TransportMethod::Get,
        Method::HEAD => TransportMethod::Head,
        ref method => TransportMethod::Custom(method.to_string()),
    };

    if matches!(*request.method(), Method::GET | Method::HEAD | Method::TRACE) {
        return Ok((method, TransportBody::None));
    }

    let body = request.body()?;
    let body = match body.size() {
        Some(0) => TransportBody::None,
        Some(size) if size <= MAX_BUFFERED_BODY_SIZE => {
            debug!(size, "buffering request body");
            TransportBody::Fields(body.contents()?)
        }
        size => {
            debug!(?size, "streaming request body");
            if body.is_seekable() {
                body.rewind()?;
            }
            TransportBody::Upload { size, source: body }
        }
    };
    Ok((method, body))
}

/// Builds the `Name: value` lines sent with the request.
fn header_lines(request: &Request, body: &TransportBody, default_headers: &[(String, String)]) -> Vec<String> {
    let mut lines = Vec::with_capacity(request.headers().len() + default_headers.len() + 1);

    for (name, values) in request.headers() {
        if name.eq_ignore_ascii_case("expect") {
            continue;
        }

        if name.eq_ignore_ascii_case("content-length") {
            match body {
                TransportBody::Fields(bytes) => {
                    lines.push(format!("{name}: {}", bytes.len()));
                    continue;
                }
                TransportBody::None => {
                    lines.push(format!("{name}: 0"));
                    continue;
                }
                TransportBody::Upload { .. } => {}
            }
        }

        lines.extend(values.iter().map(|value| format!("{name}: {value}")));
    }

    for (name, value) in default_headers {
        if !request.has_header(name) {
            lines.push(format!("{name}: {value}"));
        }
    }

    lines.push(String::from("Expect:"));
    lines
}

/// Builder for [`HttpClient`].
#[derive(Debug)]
pub struct HttpClientBuilder<T> {
    transport: T,
    connect_timeout: Option<Duration>,
    timeout: Option<Duration>,
    default_headers: Vec<(String, String)>,
}

impl HttpClientBuilder<TcpTransport> {
    fn new() -> Self {
        Self { transport: TcpTransport::new(), connect_timeout: None, timeout: None, default_headers: Vec::new() }
    }
}

impl<T: Transport> HttpClientBuilder<T> {
    /// Replaces the transport.
    pub fn transport<U: Transport>(self, transport: U) -> HttpClientBuilder<U> {
        HttpClientBuilder {
            transport,
            connect_timeout: self.connect_timeout,
            timeout: self.timeout,
            default_headers: self.default_headers,
        }
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Limits each blocking read and write of a transfer.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// A header sent with every request that doesn't set it itself.
    pub fn default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.push((name.into(), value.into()));
        self
    }

    pub fn build(self) -> HttpClient<T> {
        HttpClient {
            transport: self.transport,
            connect_timeout: self.connect_timeout,
            timeout: self.timeout,
            default_headers: self.default_headers,
        }
    }
}
