//! An immutable HTTP message model
//!
//! This crate provides the value objects an HTTP client works with: uris, headers, byte
//! streams, uploaded files, requests and responses. Every message type is immutable: each
//! `with_*` method validates its input and returns a new value, leaving the original as it was.
//!
//! # Example
//!
//! ```
//! use micro_message::{Payload, Request, Response};
//!
//! let request = Request::new("POST", "https://example.com/users")
//!     .unwrap()
//!     .with_content("application/x-www-form-urlencoded", Payload::fields([("name", "micro")]))
//!     .unwrap();
//!
//! assert_eq!(request.header_line("Host"), "example.com");
//! assert_eq!(&request.body().unwrap().to_bytes().unwrap()[..], b"name=micro");
//!
//! let response = Response::new(404).unwrap();
//! assert_eq!(response.reason(), "Not Found");
//! ```
//!
//! # Architecture
//!
//! - [`uri`]: RFC 3986 [`Uri`] with component filters and reference helpers
//! - [`header`]: the case-insensitive, order-preserving [`Headers`] collection
//! - [`stream`]: [`HttpStream`](stream::HttpStream) over memory, files or readers, shared
//!   through [`SharedStream`]
//! - [`upload`]: [`UploadedFile`] with move-once semantics
//! - [`encoding`]: request body encoding by content type (form, json, multipart)
//! - [`request`] and [`response`]: the messages themselves
//!
//! # Body Encoding
//!
//! A request keeps a typed [`Payload`] and only encodes it when [`Request::body`] is called.
//! Payload shape errors are therefore reported by `body()`, not by `with_content()`.
//!
//! # Error Handling
//!
//! All fallible operations return [`MessageError`]. Nothing in this crate retries or panics on
//! bad input.

pub mod encoding;
pub mod header;
pub mod request;
pub mod response;
pub mod stream;
pub mod upload;
pub mod uri;

mod error;
mod utils;

pub use encoding::{FieldValue, Payload};
pub use error::{MessageError, Result};
pub use header::Headers;
pub use request::{Request, RequestBuilder};
pub use response::Response;
pub use stream::SharedStream;
pub use upload::{UploadError, UploadedFile, UploadedFileEntry};
pub use uri::Uri;

pub(crate) use utils::ensure;
