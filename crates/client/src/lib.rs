//! A blocking HTTP client for [`micro_message`] requests.
//!
//! [`HttpClient`] sends an immutable [`Request`](micro_message::Request) and returns an
//! immutable [`Response`](micro_message::Response) whose body is fully received and rewound.
//! The bytes are moved by a [`Transport`]; [`TcpTransport`] speaks HTTP/1.x over plain TCP,
//! and tests or other engines can plug in their own.
//!
//! # Example
//!
//! ```no_run
//! use micro_client::HttpClient;
//! use micro_message::{Payload, Request};
//!
//! let mut client = HttpClient::new();
//!
//! let request = Request::new("POST", "http://localhost:8080/users")
//!     .unwrap()
//!     .with_content("application/json", Payload::fields([("name", "micro")]))
//!     .unwrap();
//!
//! let response = client.send_request(&request).unwrap();
//! println!("{}", String::from_utf8_lossy(&response.body().contents().unwrap()));
//! ```
//!
//! # Architecture
//!
//! - [`client`]: request translation, error classification and [`HttpClientBuilder`]
//! - [`transport`]: the [`Transport`] seam and the default [`TcpTransport`]
//! - [`codec`]: response head and body decoders used by [`TcpTransport`]
//! - [`response_builder`]: turns transport callbacks into a response
//! - [`middleware`]: an ordered [`MiddlewareChain`](middleware::MiddlewareChain) in front of
//!   a client
//!
//! # Error Handling
//!
//! Every failure is a [`ClientError`]. Transport failures keep the request that failed:
//! [`ClientError::Network`] when the server could not be reached, [`ClientError::Request`]
//! otherwise. Nothing is retried.

pub mod client;
pub mod codec;
pub mod middleware;
pub mod response_builder;
pub mod transport;

mod error;
mod utils;

pub use client::{HttpClient, HttpClientBuilder, MAX_BUFFERED_BODY_SIZE};
pub use error::ClientError;
pub use transport::{TcpTransport, Transport, TransportError, TransportErrorKind, TransportHandler, TransportOptions};
pub(crate) use utils::ensure;
