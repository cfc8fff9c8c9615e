use crate::encoding::Payload;
use crate::header::{Headers, normalize_value};
use crate::uri::Uri;
use crate::{MessageError, Request};

/// Builder for [`Request`].
///
/// Errors are kept until [`RequestBuilder::build`], so calls can be chained freely:
///
/// ```
/// use micro_message::Request;
///
/// let error = Request::builder().method("GET").uri("http://").header("a", "b").build();
/// assert!(error.unwrap_err().is_invalid_format());
/// ```
#[derive(Debug)]
pub struct RequestBuilder {
    inner: Result<Parts, MessageError>,
}

#[derive(Debug)]
struct Parts {
    method: String,
    uri: Uri,
    headers: Headers,
    payload: Payload,
    version: String,
}

impl RequestBuilder {
    pub fn new() -> Self {
        Self {
            inner: Ok(Parts {
                method: "GET".to_string(),
                uri: Uri::default(),
                headers: Headers::new(),
                payload: Payload::Empty,
                version: "1.1".to_string(),
            }),
        }
    }

    /// Sets the method, `GET` by default.
    #[must_use]
    pub fn method(self, method: impl Into<String>) -> Self {
        self.and_then(|mut parts| {
            parts.method = method.into();
            Ok(parts)
        })
    }

    /// Parses and sets the uri.
    #[must_use]
    pub fn uri(self, uri: &str) -> Self {
        self.and_then(|mut parts| {
            parts.uri = Uri::parse(uri)?;
            Ok(parts)
        })
    }

    /// Sets an already parsed uri.
    #[must_use]
    pub fn with_uri(self, uri: Uri) -> Self {
        self.and_then(|mut parts| {
            parts.uri = uri;
            Ok(parts)
        })
    }

    /// Appends a header value; repeated names are merged.
    #[must_use]
    pub fn header(self, name: &str, value: &str) -> Self {
        self.and_then(|mut parts| {
            parts.headers.append(name, vec![normalize_value(value)?])?;
            Ok(parts)
        })
    }

    #[must_use]
    pub fn payload(self, payload: impl Into<Payload>) -> Self {
        self.and_then(|mut parts| {
            parts.payload = payload.into();
            Ok(parts)
        })
    }

    /// Sets the protocol version, `1.1` by default.
    #[must_use]
    pub fn version(self, version: impl Into<String>) -> Self {
        self.and_then(|mut parts| {
            parts.version = version.into();
            Ok(parts)
        })
    }

    /// Builds the request.
    ///
    /// # Errors
    ///
    /// Returns the first error met while building, or a method validation error.
    pub fn build(self) -> Result<Request, MessageError> {
        let parts = self.inner?;
        Request::from_parts(&parts.method, parts.uri, parts.headers, parts.payload, parts.version)
    }

    fn and_then<F>(self, f: F) -> Self
    where
        F: FnOnce(Parts) -> Result<Parts, MessageError>,
    {
        Self { inner: self.inner.and_then(f) }
    }
}

impl Default for RequestBuilder {
    fn default() -> Self {
        Self::new()
    }
}
