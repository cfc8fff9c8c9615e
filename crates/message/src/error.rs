use std::io;
use thiserror::Error;

/// Errors raised by the message value objects.
///
/// Every failure is local and synchronous: nothing in this crate retries. Body related errors
/// ([`MessageError::UnexpectedBody`], [`MessageError::InvalidUploadFile`]) are raised when the
/// request body is materialized, not when the payload is attached.
#[derive(Error, Debug)]
pub enum MessageError {
    /// malformed header name/value, uri component, status code, method or move target
    #[error("invalid argument: {reason}")]
    InvalidArgument { reason: String },

    /// unparseable uri or wire line
    #[error("invalid format: {reason}")]
    InvalidFormat { reason: String },

    /// payload shape does not fit the declared content type
    #[error("unexpected body: {reason}")]
    UnexpectedBody { reason: String },

    /// a multipart file slot holds something that is not an uploaded file
    #[error("invalid upload file: {reason}")]
    InvalidUploadFile { reason: String },

    /// stream detached/not readable/not writable/not seekable, upload moved or in error
    #[error("invalid state: {reason}")]
    InvalidState { reason: String },

    #[error("encoding error: {reason}")]
    Encoding { reason: String },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl MessageError {
    pub fn invalid_argument<S: ToString>(str: S) -> Self {
        Self::InvalidArgument { reason: str.to_string() }
    }

    pub fn invalid_format<S: ToString>(str: S) -> Self {
        Self::InvalidFormat { reason: str.to_string() }
    }

    pub fn unexpected_body<S: ToString>(str: S) -> Self {
        Self::UnexpectedBody { reason: str.to_string() }
    }

    pub fn invalid_upload_file<S: ToString>(str: S) -> Self {
        Self::InvalidUploadFile { reason: str.to_string() }
    }

    pub fn invalid_state<S: ToString>(str: S) -> Self {
        Self::InvalidState { reason: str.to_string() }
    }

    pub fn encoding<S: ToString>(str: S) -> Self {
        Self::Encoding { reason: str.to_string() }
    }

    pub fn io<E: Into<io::Error>>(e: E) -> Self {
        Self::Io { source: e.into() }
    }

    /// Returns true for argument errors, the kind every validator in this crate raises.
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::InvalidArgument { .. })
    }

    pub fn is_invalid_state(&self) -> bool {
        matches!(self, Self::InvalidState { .. })
    }

    pub fn is_unexpected_body(&self) -> bool {
        matches!(self, Self::UnexpectedBody { .. })
    }

    pub fn is_invalid_upload_file(&self) -> bool {
        matches!(self, Self::InvalidUploadFile { .. })
    }

    pub fn is_invalid_format(&self) -> bool {
        matches!(self, Self::InvalidFormat { .. })
    }
}

pub type Result<T> = std::result::Result<T, MessageError>;
