//! A blocking HTTP/1.x transport over [`std::net::TcpStream`].
//!
//! Each transfer opens a new connection and sends `Connection: close`. Only plain `http`
//! urls are served; `https` fails with [`TransportErrorKind::UnsupportedProtocol`]. A url
//! without a scheme, like `localhost:8080/status`, is read as an `http` url.
//!
//! Request header lines come from [`TransportOptions::headers`]. A line with an empty value
//! (`Expect:`) removes that header, including the ones this transport would add itself:
//! `Host`, `Authorization` and `Connection`. When a body is sent, `Content-Length` and
//! `Transfer-Encoding` always describe how this transport writes it; caller lines for those
//! two headers are dropped.

use std::collections::HashSet;
use std::io::{self, ErrorKind, Read, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use bytes::BytesMut;
use micro_message::SharedStream;
use micro_message::uri::Uri;
use micro_message::uri::helper::{default_port, percent_decode};
use tokio_util::codec::Decoder;
use tracing::{debug, trace};

use super::{HttpVersion, Transport, TransportBody, TransportError, TransportErrorKind, TransportHandler, TransportMethod, TransportOptions};
use crate::codec::{PayloadItem, ResponseHead, ResponseHeadDecoder};
use crate::ensure;

const READ_BUFFER_SIZE: usize = 8 * 1024;

/// Size of each read from an upload source.
const UPLOAD_CHUNK_SIZE: usize = 16 * 1024;

/// The default [`Transport`].
///
/// # Example
///
/// ```no_run
/// use micro_client::{HttpClient, TcpTransport};
/// use micro_message::Request;
///
/// let transport = TcpTransport::new().with_max_headers(32);
/// let mut client = HttpClient::builder().transport(transport).build();
///
/// let response = client.send_request(&Request::new("GET", "http://localhost:8080/").unwrap()).unwrap();
/// println!("{}", response.status());
/// ```
#[derive(Debug)]
pub struct TcpTransport {
    head_decoder: ResponseHeadDecoder,
    max_headers: usize,
    max_header_bytes: usize,
    /// read buffer kept across transfers
    buffer: BytesMut,
}

impl TcpTransport {
    pub fn new() -> Self {
        Self::with_limits(crate::codec::DEFAULT_MAX_HEADERS, crate::codec::DEFAULT_MAX_HEADER_BYTES)
    }

    fn with_limits(max_headers: usize, max_header_bytes: usize) -> Self {
        Self {
            head_decoder: ResponseHeadDecoder::new(max_headers, max_header_bytes),
            max_headers,
            max_header_bytes,
            buffer: BytesMut::with_capacity(READ_BUFFER_SIZE),
        }
    }

    /// Limits the number of response headers.
    pub fn with_max_headers(self, max_headers: usize) -> Self {
        Self::with_limits(max_headers, self.max_header_bytes)
    }

    /// Limits the size of the response head, status line included.
    pub fn with_max_header_bytes(self, max_header_bytes: usize) -> Self {
        Self::with_limits(self.max_headers, max_header_bytes)
    }

    fn connect(target: &Target, options: &TransportOptions) -> Result<TcpStream, TransportError> {
        let addrs: Vec<SocketAddr> = (target.host.as_str(), target.port)
            .to_socket_addrs()
            .map_err(|e| TransportError::new(TransportErrorKind::CouldNotResolveHost, format!("{}: {e}", target.host)))?
            .collect();
        ensure!(!addrs.is_empty(), TransportError::new(TransportErrorKind::CouldNotResolveHost, &target.host));

        let mut last_error = None;
        for addr in addrs {
            let connected = match options.connect_timeout {
                Some(timeout) if !timeout.is_zero() => TcpStream::connect_timeout(&addr, timeout),
                _ => TcpStream::connect(addr),
            };
            match connected {
                Ok(stream) => {
                    debug!(%addr, "connected");
                    let timeout = options.timeout.filter(|timeout| !timeout.is_zero());
                    stream.set_read_timeout(timeout)?;
                    stream.set_write_timeout(timeout)?;
                    return Ok(stream);
                }
                Err(e) => {
                    trace!(%addr, error = %e, "connect attempt failed");
                    last_error = Some(e);
                }
            }
        }

        let kind = match last_error.as_ref().map(io::Error::kind) {
            Some(ErrorKind::TimedOut | ErrorKind::WouldBlock) => TransportErrorKind::OperationTimedOut,
            _ => TransportErrorKind::CouldNotConnect,
        };
        let message = last_error.map_or_else(|| target.authority.clone(), |e| format!("{}: {e}", target.authority));
        Err(TransportError::new(kind, message))
    }

    /// Reads more response bytes into the buffer, returning 0 once the peer closed.
    fn fill(&mut self, stream: &mut TcpStream) -> Result<usize, TransportError> {
        let mut chunk = [0u8; READ_BUFFER_SIZE];
        let read = loop {
            match stream.read(&mut chunk) {
                Ok(read) => break read,
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
        };
        self.buffer.extend_from_slice(&chunk[..read]);
        Ok(read)
    }

    fn read_head(&mut self, stream: &mut TcpStream) -> Result<ResponseHead, TransportError> {
        loop {
            if let Some(head) = self.head_decoder.decode(&mut self.buffer)? {
                return Ok(head);
            }
            ensure!(
                self.fill(stream)? > 0,
                TransportError::new(TransportErrorKind::RecvError, "connection closed before the response head was complete")
            );
        }
    }

    fn read_response(
        &mut self,
        stream: &mut TcpStream,
        method: &TransportMethod,
        handler: &mut dyn TransportHandler,
    ) -> Result<(), TransportError> {
        let head = loop {
            let head = self.read_head(stream)?;
            report_head(&head, handler)?;
            if !head.is_interim() {
                break head;
            }
            trace!(status = head.status, "skipped interim response");
        };

        let mut decoder = head.payload_decoder(*method == TransportMethod::Head)?;
        let mut closed = false;
        loop {
            let item = if closed { decoder.decode_eof(&mut self.buffer)? } else { decoder.decode(&mut self.buffer)? };
            match item {
                Some(PayloadItem::Chunk(bytes)) => ensure!(handler.on_body(&bytes), TransportError::aborted()),
                Some(PayloadItem::Eof) => break,
                None if closed => break,
                None => closed = self.fill(stream)? == 0,
            }
        }

        debug!(status = head.status, "response received");
        Ok(())
    }
}

impl Default for TcpTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for TcpTransport {
    fn reset(&mut self) {
        self.buffer.clear();
    }

    fn perform(&mut self, options: &TransportOptions, handler: &mut dyn TransportHandler) -> Result<(), TransportError> {
        let target = Target::parse(&options.url)?;
        let http_version = match options.version {
            HttpVersion::Http10 => "HTTP/1.0",
            HttpVersion::None | HttpVersion::Http11 => "HTTP/1.1",
            HttpVersion::Http2 => return Err(TransportError::unsupported_protocol("HTTP/2 is not available over plain tcp")),
        };

        let mut body = options.body.clone();
        if options.version == HttpVersion::Http10 {
            // HTTP/1.0 has no chunked framing, so an unsized upload is sent buffered
            if let TransportBody::Upload { size: None, source } = &body {
                body = TransportBody::Fields(source.remaining()?);
            }
        }

        let head = request_head(options, &target, http_version, &body);
        trace!(method = options.method.as_str(), url = %options.url, "sending request");

        let mut stream = Self::connect(&target, options)?;
        stream.write_all(&head).map_err(send_error)?;
        write_body(&mut stream, &body)?;
        stream.flush().map_err(send_error)?;

        self.read_response(&mut stream, &options.method, handler)
    }
}

/// Where a request goes.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Target {
    host: String,
    port: u16,
    /// `Host` header value
    authority: String,
    /// path and query, `/` when empty
    request_target: String,
}

impl Target {
    fn parse(url: &str) -> Result<Self, TransportError> {
        let uri = if url.contains("://") {
            Uri::parse(url)
        } else {
            Uri::parse(&format!("http://{url}"))
        }
        .map_err(|e| TransportError::url_malformat(format!("{url}: {e}")))?;

        match uri.scheme() {
            "http" => {}
            "https" => return Err(TransportError::unsupported_protocol("https requires tls, which this transport does not provide")),
            scheme => return Err(TransportError::unsupported_protocol(format!("scheme {scheme:?} is not supported"))),
        }
        ensure!(!uri.host().is_empty(), TransportError::url_malformat(format!("no host in {url}")));

        let port = uri.port().or_else(|| default_port(uri.scheme())).unwrap_or(80);
        let authority = match uri.port() {
            Some(port) => format!("{}:{port}", uri.host()),
            None => uri.host().to_string(),
        };
        let mut request_target = if uri.path().is_empty() { String::from("/") } else { uri.path().to_string() };
        if !uri.query().is_empty() {
            request_target.push('?');
            request_target.push_str(uri.query());
        }

        Ok(Self {
            host: uri.host().trim_start_matches('[').trim_end_matches(']').to_string(),
            port,
            authority,
            request_target,
        })
    }
}

/// Serializes the request line and header block.
///
/// A request with a body is always framed by this transport: caller `Content-Length` and
/// `Transfer-Encoding` lines are replaced by the framing the body is actually written with.
fn request_head(options: &TransportOptions, target: &Target, http_version: &str, body: &TransportBody) -> Vec<u8> {
    let mut head = format!("{} {} {http_version}\r\n", options.method.as_str(), target.request_target);
    let mut seen = HashSet::new();

    for line in &options.headers {
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        let (name, value) = (name.trim(), value.trim());
        if !body.is_none() && is_framing_header(name) {
            trace!(header = name, "replacing caller framing header");
            continue;
        }
        seen.insert(name.to_ascii_lowercase());
        if !value.is_empty() {
            head.push_str(&format!("{name}: {value}\r\n"));
        }
    }

    let mut defaults = vec![("Host", target.authority.clone())];
    if let Some(credentials) = &options.credentials {
        defaults.push(("Authorization", format!("Basic {}", STANDARD.encode(percent_decode(credentials)))));
    }
    match body {
        TransportBody::None => {}
        TransportBody::Fields(bytes) => defaults.push(("Content-Length", bytes.len().to_string())),
        TransportBody::Upload { size: Some(size), .. } => defaults.push(("Content-Length", size.to_string())),
        TransportBody::Upload { size: None, .. } => defaults.push(("Transfer-Encoding", String::from("chunked"))),
    }
    defaults.push(("Connection", String::from("close")));

    for (name, value) in defaults {
        if !seen.contains(&name.to_ascii_lowercase()) {
            head.push_str(&format!("{name}: {value}\r\n"));
        }
    }

    head.push_str("\r\n");
    head.into_bytes()
}

fn is_framing_header(name: &str) -> bool {
    name.eq_ignore_ascii_case("content-length") || name.eq_ignore_ascii_case("transfer-encoding")
}

fn write_body(stream: &mut TcpStream, body: &TransportBody) -> Result<(), TransportError> {
    match body {
        TransportBody::None => Ok(()),
        TransportBody::Fields(bytes) => stream.write_all(bytes).map_err(send_error),
        TransportBody::Upload { size: Some(size), source } => write_sized_upload(stream, source, *size),
        TransportBody::Upload { size: None, source } => write_chunked_upload(stream, source),
    }
}

fn write_sized_upload(stream: &mut TcpStream, source: &SharedStream, size: u64) -> Result<(), TransportError> {
    let mut sent = 0u64;
    while sent < size {
        let wanted = usize::try_from(size - sent).map_or(UPLOAD_CHUNK_SIZE, |left| left.min(UPLOAD_CHUNK_SIZE));
        let chunk = source.read(wanted)?;
        ensure!(
            !chunk.is_empty(),
            TransportError::new(TransportErrorKind::ReadError, format!("upload source ended after {sent} of {size} bytes"))
        );
        stream.write_all(&chunk).map_err(send_error)?;
        sent += chunk.len() as u64;
    }
    trace!(sent, "uploaded body");
    Ok(())
}

fn write_chunked_upload(stream: &mut TcpStream, source: &SharedStream) -> Result<(), TransportError> {
    let mut sent = 0u64;
    loop {
        let chunk = source.read(UPLOAD_CHUNK_SIZE)?;
        if chunk.is_empty() {
            break;
        }
        stream.write_all(format!("{:x}\r\n", chunk.len()).as_bytes()).map_err(send_error)?;
        stream.write_all(&chunk).map_err(send_error)?;
        stream.write_all(b"\r\n").map_err(send_error)?;
        sent += chunk.len() as u64;
    }
    stream.write_all(b"0\r\n\r\n").map_err(send_error)?;
    trace!(sent, "uploaded chunked body");
    Ok(())
}

fn report_head(head: &ResponseHead, handler: &mut dyn TransportHandler) -> Result<(), TransportError> {
    ensure!(handler.on_header(head.status_line().as_bytes()), TransportError::aborted());
    for (name, value) in &head.headers {
        ensure!(handler.on_header(format!("{name}: {value}").as_bytes()), TransportError::aborted());
    }
    Ok(())
}

fn send_error(e: io::Error) -> TransportError {
    match e.kind() {
        ErrorKind::TimedOut | ErrorKind::WouldBlock => TransportError::new(TransportErrorKind::OperationTimedOut, e),
        _ => TransportError::new(TransportErrorKind::SendError, e),
    }
}
