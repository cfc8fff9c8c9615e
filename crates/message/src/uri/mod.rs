//! RFC 3986 uri value object.
//!
//! [`Uri`] is immutable: every `with_*` method validates and percent-encodes the new
//! component and returns a fresh value, or an identical clone when nothing changed.
//! The composed string form is computed lazily and cached per value.
//!
//! The [`helper`] functions classify uri references (absolute, network-path, ...) and
//! know the default ports of the common schemes.

mod filter;
pub mod helper;
mod reference;

pub use reference::Uri;
