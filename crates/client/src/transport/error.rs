use std::fmt;
use std::io;

use micro_message::MessageError;
use thiserror::Error;

/// What went wrong in a transport, in the vocabulary of a curl-like engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportErrorKind {
    UnsupportedProtocol,
    UrlMalformat,
    CouldNotResolveProxy,
    CouldNotResolveHost,
    CouldNotConnect,
    OperationTimedOut,
    SslConnectError,
    SendError,
    RecvError,
    WeirdServerReply,
    ReadError,
    /// a [`TransportHandler`](super::TransportHandler) callback asked to stop
    Aborted,
}

impl TransportErrorKind {
    /// Whether the server could not be reached at all.
    pub fn is_network(self) -> bool {
        matches!(
            self,
            Self::CouldNotResolveProxy
                | Self::CouldNotResolveHost
                | Self::CouldNotConnect
                | Self::OperationTimedOut
                | Self::SslConnectError
        )
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::UnsupportedProtocol => "unsupported protocol",
            Self::UrlMalformat => "url malformed",
            Self::CouldNotResolveProxy => "could not resolve proxy",
            Self::CouldNotResolveHost => "could not resolve host",
            Self::CouldNotConnect => "could not connect",
            Self::OperationTimedOut => "operation timed out",
            Self::SslConnectError => "ssl connect error",
            Self::SendError => "send error",
            Self::RecvError => "receive error",
            Self::WeirdServerReply => "weird server reply",
            Self::ReadError => "read error",
            Self::Aborted => "aborted by callback",
        }
    }
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed transfer.
#[derive(Error, Debug)]
#[error("{kind}: {message}")]
pub struct TransportError {
    kind: TransportErrorKind,
    message: String,
}

impl TransportError {
    pub fn new<S: ToString>(kind: TransportErrorKind, message: S) -> Self {
        Self { kind, message: message.to_string() }
    }

    pub fn unsupported_protocol<S: ToString>(str: S) -> Self {
        Self::new(TransportErrorKind::UnsupportedProtocol, str)
    }

    pub fn url_malformat<S: ToString>(str: S) -> Self {
        Self::new(TransportErrorKind::UrlMalformat, str)
    }

    pub fn weird_server_reply<S: ToString>(str: S) -> Self {
        Self::new(TransportErrorKind::WeirdServerReply, str)
    }

    pub fn aborted() -> Self {
        Self::new(TransportErrorKind::Aborted, "transfer stopped by the response handler")
    }

    pub fn kind(&self) -> TransportErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is_network(&self) -> bool {
        self.kind.is_network()
    }
}

impl From<io::Error> for TransportError {
    fn from(e: io::Error) -> Self {
        let kind = match e.kind() {
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TransportErrorKind::OperationTimedOut,
            io::ErrorKind::ConnectionRefused => TransportErrorKind::CouldNotConnect,
            _ => TransportErrorKind::RecvError,
        };
        Self::new(kind, e)
    }
}

/// Upload sources are message streams, so their failures surface as read errors.
impl From<MessageError> for TransportError {
    fn from(e: MessageError) -> Self {
        Self::new(TransportErrorKind::ReadError, e)
    }
}
