//! Byte streams backing message bodies and uploaded files.
//!
//! An [`HttpStream`] wraps one open resource: an in-memory buffer, a file, or an arbitrary
//! reader. Its readable/writable/seekable flags are derived once, from the [`OpenMode`] for
//! files and from the resource kind otherwise. Every operation fails with
//! [`MessageError::InvalidState`](crate::MessageError::InvalidState) once the stream has been
//! detached or closed.
//!
//! Messages hold streams through [`SharedStream`], so that a request copied by a `with_*`
//! method keeps pointing at the same body. The [`factory`] functions are the usual entry
//! points:
//!
//! ```
//! use micro_message::stream::factory;
//!
//! let stream = factory::create_stream("thisIsContent");
//! assert_eq!(stream.size(), Some(13));
//! assert_eq!(&stream.read(4).unwrap()[..], b"this");
//! assert_eq!(&stream.contents().unwrap()[..], b"IsContent");
//! assert_eq!(stream.tell().unwrap(), 0);
//! ```

pub mod factory;
mod http_stream;
mod mode;
mod shared;

pub use http_stream::HttpStream;
pub use http_stream::StreamResource;
pub use mode::OpenMode;
pub use shared::SharedStream;
