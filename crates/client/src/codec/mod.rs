//! Response decoding for [`TcpTransport`](crate::transport::TcpTransport).
//!
//! The decoders implement [`tokio_util::codec::Decoder`] over a [`BytesMut`](bytes::BytesMut)
//! read buffer, so the transport only has to keep filling the buffer until a decoder yields
//! an item:
//!
//! - [`ResponseHeadDecoder`] parses the status line and headers with `httparse`
//! - [`PayloadDecoder`] picks the body framing: `Content-Length`, chunked, or read until the
//!   server closes the connection

mod chunked_decoder;
mod head_decoder;
mod length_decoder;
mod payload_decoder;

pub use head_decoder::{DEFAULT_MAX_HEADER_BYTES, DEFAULT_MAX_HEADERS, ResponseHead, ResponseHeadDecoder};
pub use payload_decoder::PayloadDecoder;

use bytes::Bytes;

/// One step of a decoded body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadItem {
    Chunk(Bytes),
    Eof,
}

impl PayloadItem {
    pub fn is_chunk(&self) -> bool {
        matches!(self, Self::Chunk(_))
    }

    pub fn is_eof(&self) -> bool {
        matches!(self, Self::Eof)
    }

    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            Self::Chunk(bytes) => Some(bytes),
            Self::Eof => None,
        }
    }
}
