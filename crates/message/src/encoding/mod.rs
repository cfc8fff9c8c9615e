//! Request body encoding, selected by the `Content-Type` header.
//!
//! A request keeps its body as a [`Payload`] until the body is asked for. At that point the
//! [`ContentEncoder`] matching the content type turns the payload (and, for multipart bodies,
//! the uploaded files) into bytes:
//!
//! | content type                        | accepted payloads                     |
//! |-------------------------------------|---------------------------------------|
//! | `application/x-www-form-urlencoded` | fields, objects, arrays               |
//! | `application/json`                  | anything, `Empty` encodes to nothing  |
//! | `multipart/form-data`               | fields, objects, arrays, or nothing   |
//! | anything else                       | text or nothing                       |
//!
//! `GET`, `HEAD` and `TRACE` requests never have a body, whatever the payload. Shape errors
//! surface here, not when the payload is attached.

mod form;
mod multipart;
mod payload;

pub use payload::{FieldValue, Payload};

pub(crate) use form::{decode_pairs, encode_pairs};

use bytes::Bytes;
use http::Method;
use tracing::debug;

use crate::MessageError;
use crate::upload::UploadedFileEntry;

/// Everything a body encoder may look at.
#[derive(Debug, Clone, Copy)]
pub struct BodyContext<'a> {
    pub method: &'a Method,
    pub content_type: &'a str,
    pub request_target: &'a str,
    pub payload: &'a Payload,
    pub files: &'a [(String, UploadedFileEntry)],
}

/// Body serialization strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentEncoder {
    /// `GET`, `HEAD` and `TRACE` requests
    NoBody,
    FormUrlEncoded,
    Json,
    Multipart,
    /// the payload text as is
    Raw,
}

impl ContentEncoder {
    /// Selects the encoder for a method and a `Content-Type` header line. The content type is
    /// matched by substring, ignoring case.
    pub fn select(method: &Method, content_type: &str) -> Self {
        if is_bodiless(method) {
            return Self::NoBody;
        }

        let content_type = content_type.to_ascii_lowercase();
        if content_type.contains(mime::APPLICATION_WWW_FORM_URLENCODED.essence_str()) {
            Self::FormUrlEncoded
        } else if content_type.contains(mime::APPLICATION_JSON.essence_str()) {
            Self::Json
        } else if content_type.contains(mime::MULTIPART_FORM_DATA.essence_str()) {
            Self::Multipart
        } else {
            Self::Raw
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::NoBody => "none",
            Self::FormUrlEncoded => "form-urlencoded",
            Self::Json => "json",
            Self::Multipart => "multipart",
            Self::Raw => "raw",
        }
    }

    /// Encodes the body described by `ctx`.
    ///
    /// # Errors
    ///
    /// - [`MessageError::UnexpectedBody`] if the payload doesn't fit the content type
    /// - [`MessageError::InvalidUploadFile`] if a multipart file slot is malformed
    /// - [`MessageError::Encoding`] if the payload can't be serialized
    pub fn encode(self, ctx: &BodyContext<'_>) -> Result<Bytes, MessageError> {
        debug!(encoder = self.name(), method = %ctx.method, "encoding request body");

        match self {
            Self::NoBody => Ok(Bytes::new()),
            Self::FormUrlEncoded => form::encode(ctx.payload).map(Bytes::from),
            Self::Json => match ctx.payload {
                Payload::Empty => Ok(Bytes::new()),
                payload => serde_json::to_vec(payload)
                    .map(Bytes::from)
                    .map_err(|e| MessageError::encoding(format!("content could not be json encoded: {e}"))),
            },
            Self::Multipart => multipart::encode(ctx, &multipart::boundary(ctx)?),
            Self::Raw => match ctx.payload {
                Payload::Empty => Ok(Bytes::new()),
                Payload::Text(text) => Ok(Bytes::copy_from_slice(text.as_bytes())),
                other => Err(MessageError::unexpected_body(format!(
                    "body content type cannot be used, given {}",
                    form::kind_name(other)
                ))),
            },
        }
    }
}

/// Methods whose requests never carry a body.
pub fn is_bodiless(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::HEAD | Method::TRACE)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::stream::factory;
    use crate::upload::UploadedFile;

    fn encode(method: &Method, content_type: &str, payload: &Payload, files: &[(String, UploadedFileEntry)]) -> Result<Bytes, MessageError> {
        let ctx = BodyContext { method, content_type, request_target: "/", payload, files };
        ContentEncoder::select(method, content_type).encode(&ctx)
    }

    fn post(content_type: &str, payload: Payload) -> Result<Bytes, MessageError> {
        encode(&Method::POST, content_type, &payload, &[])
    }

    #[test]
    fn select_by_content_type() {
        assert_eq!(ContentEncoder::select(&Method::POST, "application/json; charset=utf-8"), ContentEncoder::Json);
        assert_eq!(ContentEncoder::select(&Method::PUT, "Application/X-WWW-Form-Urlencoded"), ContentEncoder::FormUrlEncoded);
        assert_eq!(ContentEncoder::select(&Method::PATCH, "multipart/form-data"), ContentEncoder::Multipart);
        assert_eq!(ContentEncoder::select(&Method::POST, ""), ContentEncoder::Raw);
        assert_eq!(ContentEncoder::select(&Method::HEAD, "application/json"), ContentEncoder::NoBody);
        assert_eq!(ContentEncoder::select(&Method::TRACE, "application/json"), ContentEncoder::NoBody);
    }

    #[test]
    fn bodiless_methods_drop_payload() {
        let body = encode(&Method::GET, "application/json", &Payload::Text("content".into()), &[]).unwrap();
        assert!(body.is_empty());
    }

    #[test]
    fn json_bodies() {
        assert_eq!(&post("application/json", Payload::Empty).unwrap()[..], b"");
        assert_eq!(&post("application/json", Payload::Structured(json!(["content"]))).unwrap()[..], br#"["content"]"#);
        assert_eq!(&post("application/json", Payload::Structured(json!({"0": "content"}))).unwrap()[..], br#"{"0":"content"}"#);
        assert_eq!(&post("application/json", Payload::Text("content".into())).unwrap()[..], br#""content""#);
        assert_eq!(&post("application/json", Payload::Structured(json!(12))).unwrap()[..], b"12");
        assert_eq!(&post("application/json", Payload::fields([("b", "1"), ("a", "2")])).unwrap()[..], br#"{"b":"1","a":"2"}"#);
    }

    #[test]
    fn raw_bodies() {
        assert_eq!(&post("text/plain", Payload::Text("content".into())).unwrap()[..], b"content");
        assert!(post("text/plain", Payload::Empty).unwrap().is_empty());
        assert!(post("text/plain", Payload::Structured(json!(["content"]))).unwrap_err().is_unexpected_body());
    }

    #[test]
    fn multipart_field() {
        let body = post("multipart/form-data", Payload::fields([("field", "value")])).unwrap();
        assert_eq!(body.len(), 91);

        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(text.starts_with("--"));
        assert!(text.ends_with("\r\nContent-Disposition: form-data; name=\"field\"\r\n\r\nvalue\r\n"));
    }

    #[test]
    fn multipart_lists() {
        let payload = Payload::fields([("field", FieldValue::from(vec!["value1", "value2"]))]);
        let body = String::from_utf8(post("multipart/form-data", payload).unwrap().to_vec()).unwrap();
        assert_eq!(body.matches("name=\"field[]\"").count(), 2);
    }

    #[test]
    fn multipart_boundary_is_deterministic() {
        let payload = Payload::fields([("field", "value")]);
        assert_eq!(post("multipart/form-data", payload.clone()).unwrap(), post("multipart/form-data", payload).unwrap());
    }

    #[test]
    fn multipart_boundary_is_a_stable_digest() {
        let payload = Payload::fields([("field", "value")]);
        let ctx = BodyContext { method: &Method::POST, content_type: "multipart/form-data", request_target: "/", payload: &payload, files: &[] };
        let boundary = multipart::boundary(&ctx).unwrap();

        assert_eq!(boundary.len(), 32);
        assert!(boundary.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b)));
        assert_eq!(boundary, multipart::boundary(&ctx).unwrap());

        let other = BodyContext { request_target: "/other", ..ctx };
        assert_ne!(boundary, multipart::boundary(&other).unwrap());
    }

    #[test]
    fn multipart_files() {
        let file = UploadedFile::from_stream(factory::create_stream("data")).with_client_filename("/tmp/dir/a.txt");
        let files = vec![("upload".to_string(), UploadedFileEntry::from(file))];

        let body = encode(&Method::POST, "multipart/form-data", &Payload::Empty, &files).unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(text.ends_with("\r\nContent-Disposition: form-data; name=\"upload\"; filename=\"a.txt\"\r\nContent-Length: 4\r\n\r\ndata\r\n"));
    }

    #[test]
    fn multipart_errors() {
        assert!(post("multipart/form-data", Payload::Empty).unwrap_err().is_unexpected_body());
        assert!(post("multipart/form-data", Payload::Text("content".into())).unwrap_err().is_unexpected_body());

        let nested = UploadedFileEntry::List(vec![UploadedFileEntry::List(vec![])]);
        let files = vec![("upload".to_string(), nested)];
        let error = encode(&Method::POST, "multipart/form-data", &Payload::fields([("a", "b")]), &files).unwrap_err();
        assert!(error.is_invalid_upload_file());
    }
}
