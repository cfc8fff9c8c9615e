//! Body framing selection.

use bytes::BytesMut;
use tokio_util::codec::Decoder;

use super::PayloadItem;
use super::chunked_decoder::ChunkedDecoder;
use super::length_decoder::LengthDecoder;
use crate::transport::{TransportError, TransportErrorKind};

/// Decodes a response body with whichever framing the response head selected.
///
/// Bodies read until the connection closes only end in [`Decoder::decode_eof`]; the other
/// kinds treat an early close as a receive error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadDecoder {
    kind: Kind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Kind {
    Length(LengthDecoder),
    Chunked(ChunkedDecoder),
    UntilClose,
    NoBody,
}

impl PayloadDecoder {
    pub fn empty() -> Self {
        Self { kind: Kind::NoBody }
    }

    pub fn chunked() -> Self {
        Self { kind: Kind::Chunked(ChunkedDecoder::new()) }
    }

    pub fn fix_length(size: u64) -> Self {
        Self { kind: Kind::Length(LengthDecoder::new(size)) }
    }

    pub fn until_close() -> Self {
        Self { kind: Kind::UntilClose }
    }

    pub fn is_chunked(&self) -> bool {
        matches!(self.kind, Kind::Chunked(_))
    }

    pub fn is_empty(&self) -> bool {
        matches!(self.kind, Kind::NoBody)
    }

    pub fn is_until_close(&self) -> bool {
        matches!(self.kind, Kind::UntilClose)
    }
}

impl Decoder for PayloadDecoder {
    type Item = PayloadItem;
    type Error = TransportError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match &mut self.kind {
            Kind::Length(decoder) => decoder.decode(src),
            Kind::Chunked(decoder) => decoder.decode(src),
            Kind::UntilClose if src.is_empty() => Ok(None),
            Kind::UntilClose => Ok(Some(PayloadItem::Chunk(src.split().freeze()))),
            Kind::NoBody => Ok(Some(PayloadItem::Eof)),
        }
    }

    /// Drains the buffer after the peer closed the connection.
    ///
    /// # Errors
    ///
    /// Returns [`TransportErrorKind::RecvError`] if a length or chunk framed body is still
    /// incomplete.
    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Kind::UntilClose = self.kind {
            return if src.is_empty() { Ok(Some(PayloadItem::Eof)) } else { Ok(Some(PayloadItem::Chunk(src.split().freeze()))) };
        }

        match self.decode(src)? {
            Some(item) => Ok(Some(item)),
            None => Err(TransportError::new(TransportErrorKind::RecvError, "connection closed before the response body was complete")),
        }
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;

    #[test]
    fn test_no_body() {
        let mut buffer = BytesMut::from(&b"leftover"[..]);
        let mut decoder = PayloadDecoder::empty();
        assert!(decoder.is_empty());
        assert!(decoder.decode(&mut buffer).unwrap().unwrap().is_eof());
    }

    #[test]
    fn test_until_close() {
        let mut buffer = BytesMut::from(&b"first"[..]);
        let mut decoder = PayloadDecoder::until_close();
        assert!(decoder.is_until_close());

        let item = decoder.decode(&mut buffer).unwrap().unwrap();
        assert_eq!(item.as_bytes().unwrap(), &Bytes::from_static(b"first"));
        assert!(decoder.decode(&mut buffer).unwrap().is_none());

        buffer.extend_from_slice(b"last");
        let item = decoder.decode_eof(&mut buffer).unwrap().unwrap();
        assert_eq!(item.as_bytes().unwrap(), &Bytes::from_static(b"last"));
        assert!(decoder.decode_eof(&mut buffer).unwrap().unwrap().is_eof());
    }

    #[test]
    fn test_truncated_length_body() {
        let mut buffer = BytesMut::from(&b"abc"[..]);
        let mut decoder = PayloadDecoder::fix_length(10);

        decoder.decode(&mut buffer).unwrap().unwrap();
        let error = decoder.decode_eof(&mut buffer).unwrap_err();
        assert_eq!(error.kind(), TransportErrorKind::RecvError);
    }

    #[test]
    fn test_chunked_delegates() {
        let mut buffer = BytesMut::from(&b"3\r\nabc\r\n0\r\n\r\n"[..]);
        let mut decoder = PayloadDecoder::chunked();
        assert!(decoder.is_chunked());

        let item = decoder.decode(&mut buffer).unwrap().unwrap();
        assert_eq!(item.as_bytes().unwrap(), &Bytes::from_static(b"abc"));
        assert!(decoder.decode_eof(&mut buffer).unwrap().unwrap().is_eof());
    }
}
