use micro_message::{MessageError, Request};
use thiserror::Error;

/// Errors returned by [`HttpClient::send_request`](crate::HttpClient::send_request).
///
/// Transport failures carry the request that was being sent, so a caller holding only the
/// error can still report or retry it.
#[derive(Error, Debug)]
pub enum ClientError {
    /// the transport could not reach the server: resolve, connect, timeout or tls failures
    #[error("network error: {message}")]
    Network { request: Box<Request>, message: String },

    /// any other transport failure, or a request the transport can't express
    #[error("request error: {message}")]
    Request { request: Box<Request>, message: String },

    /// the server sent a status or header line that can't be parsed
    #[error("invalid header: {reason}")]
    InvalidHeader { reason: String },

    #[error(transparent)]
    Message(#[from] MessageError),
}

impl ClientError {
    pub fn network<S: ToString>(request: &Request, message: S) -> Self {
        Self::Network { request: Box::new(request.clone()), message: message.to_string() }
    }

    pub fn request_error<S: ToString>(request: &Request, message: S) -> Self {
        Self::Request { request: Box::new(request.clone()), message: message.to_string() }
    }

    pub fn invalid_header<S: ToString>(str: S) -> Self {
        Self::InvalidHeader { reason: str.to_string() }
    }

    /// The request that failed, for transport errors.
    pub fn request(&self) -> Option<&Request> {
        match self {
            Self::Network { request, .. } | Self::Request { request, .. } => Some(&**request),
            Self::InvalidHeader { .. } | Self::Message(_) => None,
        }
    }

    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network { .. })
    }

    pub fn is_request(&self) -> bool {
        matches!(self, Self::Request { .. })
    }

    pub fn is_invalid_header(&self) -> bool {
        matches!(self, Self::InvalidHeader { .. })
    }
}
