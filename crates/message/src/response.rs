//! Immutable responses.
//!
//! A [`Response`] carries a status code in `100..=599`, a reason phrase (taken from a fixed
//! table when none is given), [`Headers`], a protocol version and a body stream. The default
//! body is an empty, writable in-memory stream.

use serde::Serialize;
use serde_json::Value;

use crate::header::Headers;
use crate::stream::{SharedStream, factory};
use crate::{MessageError, ensure};

/// Canonical reason phrases by status code.
const REASON_PHRASES: &[(u16, &str)] = &[
    (100, "Continue"),
    (101, "Switching Protocols"),
    (102, "Processing"),
    (200, "OK"),
    (201, "Created"),
    (202, "Accepted"),
    (203, "Non-Authoritative Information"),
    (204, "No Content"),
    (205, "Reset Content"),
    (206, "Partial Content"),
    (207, "Multi-status"),
    (208, "Already Reported"),
    (300, "Multiple Choices"),
    (301, "Moved Permanently"),
    (302, "Found"),
    (303, "See Other"),
    (304, "Not Modified"),
    (305, "Use Proxy"),
    (306, "Switch Proxy"),
    (307, "Temporary Redirect"),
    (400, "Bad Request"),
    (401, "Unauthorized"),
    (402, "Payment Required"),
    (403, "Forbidden"),
    (404, "Not Found"),
    (405, "Method Not Allowed"),
    (406, "Not Acceptable"),
    (407, "Proxy Authentication Required"),
    (408, "Request Time-out"),
    (409, "Conflict"),
    (410, "Gone"),
    (411, "Length Required"),
    (412, "Precondition Failed"),
    (413, "Request Entity Too Large"),
    (414, "Request-URI Too Large"),
    (415, "Unsupported Media Type"),
    (416, "Requested range not satisfiable"),
    (417, "Expectation Failed"),
    (418, "I'm a teapot"),
    (422, "Unprocessable Entity"),
    (423, "Locked"),
    (424, "Failed Dependency"),
    (425, "Unordered Collection"),
    (426, "Upgrade Required"),
    (428, "Precondition Required"),
    (429, "Too Many Requests"),
    (431, "Request Header Fields Too Large"),
    (451, "Unavailable For Legal Reasons"),
    (500, "Internal Server Error"),
    (501, "Not Implemented"),
    (502, "Bad Gateway"),
    (503, "Service Unavailable"),
    (504, "Gateway Time-out"),
    (505, "HTTP Version not supported"),
    (506, "Variant Also Negotiates"),
    (507, "Insufficient Storage"),
    (508, "Loop Detected"),
    (510, "Not Extended"),
    (511, "Network Authentication Required"),
];

/// Returns the canonical reason phrase of a status code, if it has one.
pub fn reason_phrase(status: u16) -> Option<&'static str> {
    REASON_PHRASES.binary_search_by_key(&status, |(code, _)| *code).ok().map(|i| REASON_PHRASES[i].1)
}

/// An immutable HTTP response.
#[derive(Debug, Clone)]
pub struct Response {
    status: u16,
    reason: String,
    headers: Headers,
    version: String,
    body: SharedStream,
}

impl Response {
    /// Creates a response with the canonical reason phrase and an empty body.
    ///
    /// # Errors
    ///
    /// Returns [`MessageError::InvalidArgument`] if `status` is outside `100..=599`.
    pub fn new(status: u16) -> Result<Self, MessageError> {
        validate_status(status)?;
        Ok(Self {
            status,
            reason: reason_phrase(status).unwrap_or_default().to_string(),
            headers: Headers::new(),
            version: "1.1".to_string(),
            body: SharedStream::empty(),
        })
    }

    /// Creates a `Content-Type: application/json` response from an array- or object-shaped
    /// value.
    ///
    /// # Errors
    ///
    /// - [`MessageError::UnexpectedBody`] if `content` doesn't serialize to an array or object
    /// - [`MessageError::Encoding`] if it can't be serialized at all
    pub fn json<T: Serialize>(status: u16, content: &T) -> Result<Self, MessageError> {
        let value = serde_json::to_value(content).map_err(|e| MessageError::encoding(format!("unable to encode json content: {e}")))?;
        ensure!(
            matches!(value, Value::Array(_) | Value::Object(_)),
            MessageError::unexpected_body("json response content must be an array or an object")
        );

        let body = serde_json::to_vec(&value).map_err(|e| MessageError::encoding(format!("unable to encode json content: {e}")))?;
        Ok(Self::new(status)?.with_header("Content-Type", mime::APPLICATION_JSON.as_ref())?.with_body(factory::create_stream(body)))
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn has_header(&self, name: &str) -> bool {
        self.headers.has(name)
    }

    pub fn header(&self, name: &str) -> &[String] {
        self.headers.get(name)
    }

    pub fn header_line(&self, name: &str) -> String {
        self.headers.get_line(name)
    }

    pub fn body(&self) -> &SharedStream {
        &self.body
    }

    /// Returns a copy with the given status. An empty `reason` takes the canonical phrase.
    ///
    /// # Errors
    ///
    /// Returns [`MessageError::InvalidArgument`] if `status` is outside `100..=599`.
    pub fn with_status(&self, status: u16, reason: &str) -> Result<Self, MessageError> {
        validate_status(status)?;
        let reason = if reason.is_empty() { reason_phrase(status).unwrap_or_default() } else { reason };
        Ok(Self { status, reason: reason.to_string(), ..self.clone() })
    }

    #[must_use]
    pub fn with_protocol_version(&self, version: impl Into<String>) -> Self {
        Self { version: version.into(), ..self.clone() }
    }

    #[must_use]
    pub fn with_body(&self, body: SharedStream) -> Self {
        Self { body, ..self.clone() }
    }

    pub fn with_header(&self, name: &str, value: &str) -> Result<Self, MessageError> {
        Ok(Self { headers: self.headers.with_header(name, value)?, ..self.clone() })
    }

    pub fn with_header_values<I, V>(&self, name: &str, values: I) -> Result<Self, MessageError>
    where
        I: IntoIterator<Item = V>,
        V: AsRef<str>,
    {
        Ok(Self { headers: self.headers.with_header_values(name, values)?, ..self.clone() })
    }

    pub fn with_added_header(&self, name: &str, value: &str) -> Result<Self, MessageError> {
        Ok(Self { headers: self.headers.with_added_header(name, value)?, ..self.clone() })
    }

    #[must_use]
    pub fn without_header(&self, name: &str) -> Self {
        Self { headers: self.headers.without_header(name), ..self.clone() }
    }

    /// Replaces all headers.
    #[must_use]
    pub fn with_headers(&self, headers: Headers) -> Self {
        Self { headers, ..self.clone() }
    }
}

fn validate_status(status: u16) -> Result<(), MessageError> {
    ensure!(
        (100..600).contains(&status),
        MessageError::invalid_argument(format!("status code must be between 100 and 599, given {status}"))
    );
    Ok(())
}
