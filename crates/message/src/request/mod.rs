//! Immutable client requests.
//!
//! A [`Request`] combines a method, a [`Uri`], [`Headers`], a protocol version and a pending
//! [`Payload`]. The body bytes are only produced by [`Request::body`], which picks the
//! encoding from the `Content-Type` header (see [`crate::encoding`]).
//!
//! Every `with_*` method returns a new request. The `Host` header follows the uri: it is
//! computed at construction (unless a `Host` header was given) and whenever the uri is
//! replaced without preserving the host, and it is always the first header.
//!
//! ```
//! use micro_message::{Payload, Request};
//!
//! let request = Request::builder()
//!     .method("post")
//!     .uri("http://example.com:8080/users?page=2")
//!     .build()
//!     .unwrap()
//!     .with_content("application/json", Payload::Text("hi".into()))
//!     .unwrap();
//!
//! assert_eq!(request.method(), "POST");
//! assert_eq!(request.header_line("host"), "example.com:8080");
//! assert_eq!(request.query_param("page"), Some("2"));
//! assert_eq!(request.request_target().unwrap(), "/users?page=2");
//! assert_eq!(&request.body().unwrap().to_bytes().unwrap()[..], br#""hi""#);
//! ```

mod builder;
mod path;

pub use builder::RequestBuilder;
pub use path::PathParams;

use std::collections::HashMap;

use http::Method;
use once_cell::sync::OnceCell;
use serde_json::Value;
use tracing::trace;

use crate::encoding::{BodyContext, ContentEncoder, Payload, decode_pairs, encode_pairs};
use crate::header::Headers;
use crate::stream::{SharedStream, factory};
use crate::upload::UploadedFileEntry;
use crate::uri::Uri;
use crate::{MessageError, ensure};

const CONTENT_TYPE: &str = "Content-Type";
const HOST: &str = "Host";

/// An immutable HTTP request.
#[derive(Debug)]
pub struct Request {
    method: Method,
    uri: Uri,
    headers: Headers,
    version: String,
    payload: Payload,
    body: Option<SharedStream>,
    query_params: Vec<(String, String)>,
    attributes: HashMap<String, Value>,
    uploaded_files: Vec<(String, UploadedFileEntry)>,
    request_target: Option<String>,
    /// (template, params) of the first `path_params` call
    path_params: OnceCell<(String, PathParams)>,
}

impl Request {
    pub fn builder() -> RequestBuilder {
        RequestBuilder::new()
    }

    /// Creates a request without headers or payload.
    ///
    /// # Errors
    ///
    /// Returns [`MessageError::InvalidArgument`] for an empty or invalid method and
    /// [`MessageError::InvalidFormat`] for an unparseable uri.
    pub fn new(method: &str, uri: &str) -> Result<Self, MessageError> {
        Self::builder().method(method).uri(uri).build()
    }

    /// Assembles a request, the common path of [`RequestBuilder::build`].
    pub(crate) fn from_parts(method: &str, uri: Uri, headers: Headers, payload: Payload, version: String) -> Result<Self, MessageError> {
        let method = parse_method(method)?;
        let query_params = if uri.query().is_empty() { Vec::new() } else { decode_pairs(uri.query())? };

        let mut request = Self {
            method,
            uri,
            headers,
            version,
            // an empty text body is no body
            payload: match payload {
                Payload::Text(text) if text.is_empty() => Payload::Empty,
                payload => payload,
            },
            body: None,
            query_params,
            attributes: HashMap::new(),
            uploaded_files: Vec::new(),
            request_target: None,
            path_params: OnceCell::new(),
        };

        if !request.headers.has(HOST) {
            request.update_host_from_uri()?;
        }
        Ok(request)
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
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

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn query_params(&self) -> &[(String, String)] {
        &self.query_params
    }

    /// Returns the first value of a query parameter.
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query_params.iter().find(|(key, _)| key == name).map(|(_, value)| value.as_str())
    }

    pub fn attributes(&self) -> &HashMap<String, Value> {
        &self.attributes
    }

    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    pub fn uploaded_files(&self) -> &[(String, UploadedFileEntry)] {
        &self.uploaded_files
    }

    /// Returns a copy with the given method, uppercased.
    ///
    /// # Errors
    ///
    /// Returns [`MessageError::InvalidArgument`] for an empty or invalid method.
    pub fn with_method(&self, method: &str) -> Result<Self, MessageError> {
        let method = parse_method(method)?;
        Ok(Self { method, ..self.clone() })
    }

    /// Returns a copy with the given uri.
    ///
    /// The `Host` header is recomputed from the new uri, unless `preserve_host` is set and the
    /// request already has one.
    pub fn with_uri(&self, uri: Uri, preserve_host: bool) -> Result<Self, MessageError> {
        if uri == self.uri {
            return Ok(self.clone());
        }

        let mut request = Self { uri, ..self.clone() };
        if !preserve_host || !self.headers.has(HOST) {
            request.update_host_from_uri()?;
        }
        Ok(request)
    }

    #[must_use]
    pub fn with_protocol_version(&self, version: impl Into<String>) -> Self {
        Self { version: version.into(), ..self.clone() }
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

    /// Adds a `Content-Type` header.
    pub fn with_content_type(&self, content_type: &str) -> Result<Self, MessageError> {
        self.with_added_header(CONTENT_TYPE, content_type)
    }

    /// Adds a `Content-Type` header and replaces the pending payload.
    pub fn with_content(&self, content_type: &str, payload: Payload) -> Result<Self, MessageError> {
        let mut request = self.with_content_type(content_type)?;
        request.payload = payload;
        Ok(request)
    }

    /// Returns a copy whose body is `stream`, bypassing payload encoding.
    #[must_use]
    pub fn with_body(&self, stream: SharedStream) -> Self {
        Self { body: Some(stream), ..self.clone() }
    }

    /// Returns a copy with the given query parameters, also written into the uri query.
    /// An empty parameter list leaves the request as is.
    pub fn with_query_params<I, K, V>(&self, params: I) -> Result<Self, MessageError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let query_params: Vec<(String, String)> = params.into_iter().map(|(k, v)| (k.into(), v.into())).collect();
        if query_params.is_empty() {
            return Ok(self.clone());
        }

        let uri = self.uri.with_query(&encode_pairs(&query_params)?);
        Ok(Self { query_params, uri, ..self.clone() })
    }

    #[must_use]
    pub fn with_attribute(&self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        let mut request = self.clone();
        request.attributes.insert(name.into(), value.into());
        request
    }

    #[must_use]
    pub fn without_attribute(&self, name: &str) -> Self {
        let mut request = self.clone();
        request.attributes.remove(name);
        request
    }

    /// Returns a copy with `file` stored under the form field `name`, replacing any previous
    /// entry of that name.
    #[must_use]
    pub fn with_uploaded_file(&self, name: impl Into<String>, file: impl Into<UploadedFileEntry>) -> Self {
        let mut request = self.clone();
        request.put_uploaded_file(name.into(), file.into());
        request
    }

    /// Returns a copy with all `files` stored, see [`Request::with_uploaded_file`].
    #[must_use]
    pub fn with_uploaded_files<I, K, F>(&self, files: I) -> Self
    where
        I: IntoIterator<Item = (K, F)>,
        K: Into<String>,
        F: Into<UploadedFileEntry>,
    {
        let mut request = self.clone();
        for (name, file) in files {
            request.put_uploaded_file(name.into(), file.into());
        }
        request
    }

    fn put_uploaded_file(&mut self, name: String, file: UploadedFileEntry) {
        match self.uploaded_files.iter_mut().find(|(key, _)| *key == name) {
            Some(slot) => slot.1 = file,
            None => self.uploaded_files.push((name, file)),
        }
    }

    /// Returns the request target: the explicit one if set, else the uri path (`/` when
    /// empty) followed by the url-encoded query parameters.
    pub fn request_target(&self) -> Result<String, MessageError> {
        if let Some(target) = &self.request_target {
            return Ok(target.clone());
        }

        let mut target = if self.uri.path().is_empty() { String::from("/") } else { self.uri.path().to_string() };
        if !self.query_params.is_empty() {
            target.push('?');
            target.push_str(&encode_pairs(&self.query_params)?);
        }
        Ok(target)
    }

    /// Returns a copy with an explicit request target.
    ///
    /// # Errors
    ///
    /// Returns [`MessageError::InvalidArgument`] if the target contains whitespace.
    pub fn with_request_target(&self, target: &str) -> Result<Self, MessageError> {
        ensure!(
            !target.chars().any(char::is_whitespace),
            MessageError::invalid_argument("invalid request target provided, cannot contain whitespace")
        );
        Ok(Self { request_target: Some(target.to_string()), ..self.clone() })
    }

    /// Matches the uri path against a `{name}` route template, see [`PathParams`].
    ///
    /// The result of the first template is memoized for this request value.
    pub fn path_params(&self, template: &str) -> PathParams {
        let (cached_template, params) = self.path_params.get_or_init(|| (template.to_string(), PathParams::extract(template, self.uri.path())));
        if cached_template == template {
            params.clone()
        } else {
            PathParams::extract(template, self.uri.path())
        }
    }

    pub fn path_param(&self, template: &str, name: &str) -> Option<String> {
        self.path_params(template).get(name).map(str::to_string)
    }

    /// Returns the body stream.
    ///
    /// A stream set by [`Request::with_body`] is returned as is. Otherwise the payload is
    /// encoded according to the method and the `Content-Type` header into a new in-memory
    /// stream.
    ///
    /// # Errors
    ///
    /// See [`ContentEncoder::encode`].
    pub fn body(&self) -> Result<SharedStream, MessageError> {
        if let Some(body) = &self.body {
            return Ok(body.clone());
        }

        let content_type = self.header_line(CONTENT_TYPE);
        let request_target = self.request_target()?;
        let ctx = BodyContext {
            method: &self.method,
            content_type: &content_type,
            request_target: &request_target,
            payload: &self.payload,
            files: &self.uploaded_files,
        };

        let content = ContentEncoder::select(&self.method, &content_type).encode(&ctx)?;
        trace!(size = content.len(), "materialized request body");
        Ok(factory::create_stream(content))
    }

    /// Whether [`Request::with_body`] set an explicit stream.
    pub fn has_explicit_body(&self) -> bool {
        self.body.is_some()
    }

    fn update_host_from_uri(&mut self) -> Result<(), MessageError> {
        let host = self.uri.host();
        if host.is_empty() {
            return Ok(());
        }

        let host = match self.uri.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        };
        let name = self.headers.iter().map(|(name, _)| name).find(|name| name.eq_ignore_ascii_case(HOST)).unwrap_or(HOST).to_string();
        self.headers.set_first(&name, &host)
    }
}

/// Clones drop the memoized path parameters.
impl Clone for Request {
    fn clone(&self) -> Self {
        Self {
            method: self.method.clone(),
            uri: self.uri.clone(),
            headers: self.headers.clone(),
            version: self.version.clone(),
            payload: self.payload.clone(),
            body: self.body.clone(),
            query_params: self.query_params.clone(),
            attributes: self.attributes.clone(),
            uploaded_files: self.uploaded_files.clone(),
            request_target: self.request_target.clone(),
            path_params: OnceCell::new(),
        }
    }
}

fn parse_method(method: &str) -> Result<Method, MessageError> {
    ensure!(!method.is_empty(), MessageError::invalid_argument("method must be a non-empty string"));
    Method::from_bytes(method.to_ascii_uppercase().as_bytes()).map_err(|e| MessageError::invalid_argument(format!("invalid method {method:?}: {e}")))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::upload::UploadedFile;

    fn request(method: &str, uri: &str) -> Request {
        Request::new(method, uri).unwrap()
    }

    #[test]
    fn method_is_uppercased() {
        assert_eq!(request("get", "/").method(), &Method::GET);
        assert_eq!(request("get", "/").with_method("patch").unwrap().method(), &Method::PATCH);
        assert!(Request::new("", "/").unwrap_err().is_invalid_argument());
        assert!(request("GET", "/").with_method("GE T").unwrap_err().is_invalid_argument());
    }

    #[test]
    fn host_header_is_first() {
        let request = Request::builder().method("GET").uri("https://www.google.com:8443/path").header("Accept", "*/*").build().unwrap();

        let names: Vec<&str> = request.headers().iter().map(|(name, _)| name).collect();
        assert_eq!(names, ["Host", "Accept"]);
        assert_eq!(request.header_line("host"), "www.google.com:8443");
    }

    #[test]
    fn given_host_is_kept() {
        let request = Request::builder().method("GET").uri("https://www.google.com").header("host", "other").build().unwrap();
        assert_eq!(request.header_line("Host"), "other");
    }

    #[test]
    fn with_uri_updates_host() {
        let request = request("GET", "https://www.google.com");
        let uri = Uri::parse("http://example.com:81/x").unwrap();

        assert_eq!(request.with_uri(uri.clone(), false).unwrap().header_line("host"), "example.com:81");
        assert_eq!(request.with_uri(uri, true).unwrap().header_line("host"), "www.google.com");
    }

    #[test]
    fn query_params_from_uri() {
        let request = request("GET", "https://www.google.com?query=1");

        assert_eq!(request.uri().query(), "query=1");
        assert_eq!(request.query_param("query"), Some("1"));
        assert_eq!(request.request_target().unwrap(), "/?query=1");

        let changed = request.with_query_params([("new", "1")]).unwrap();
        assert_eq!(changed.uri().query(), "new=1");
        assert_eq!(changed.query_param("query"), None);
        assert_eq!(changed.request_target().unwrap(), "/?new=1");

        let same = request.with_query_params(Vec::<(String, String)>::new()).unwrap();
        assert_eq!(same.uri().query(), "query=1");
    }

    #[test]
    fn request_target() {
        assert_eq!(request("GET", "https://www.google.com").request_target().unwrap(), "/");

        let explicit = request("GET", "/path").with_request_target("*").unwrap();
        assert_eq!(explicit.request_target().unwrap(), "*");
        assert!(request("GET", "/").with_request_target("/a b").unwrap_err().is_invalid_argument());
    }

    #[test]
    fn bodiless_methods() {
        for method in ["GET", "HEAD", "TRACE"] {
            let request = Request::builder().method(method).uri("/").payload("content").build().unwrap();
            assert_eq!(request.body().unwrap().size(), Some(0), "{method}");
        }
    }

    #[test]
    fn content_negotiation() {
        let request = request("POST", "/").with_content("application/x-www-form-urlencoded", Payload::Structured(json!(["content"]))).unwrap();
        assert_eq!(&request.body().unwrap().to_bytes().unwrap()[..], b"0=content");

        let request = request.with_content_type("text/plain").unwrap();
        assert_eq!(request.header_line("content-type"), "application/x-www-form-urlencoded, text/plain");
    }

    #[test]
    fn empty_text_payload_is_empty() {
        let request = Request::builder().method("POST").uri("/").payload("").build().unwrap();
        assert!(request.payload().is_empty());
    }

    #[test]
    fn explicit_body_wins() {
        let stream = factory::create_stream("raw");
        let request = request("POST", "/").with_content("application/json", Payload::Text("x".into())).unwrap().with_body(stream.clone());
        assert_eq!(request.body().unwrap(), stream);
    }

    #[test]
    fn multipart_with_uploaded_file() {
        let file = UploadedFile::from_stream(factory::create_stream("data")).with_client_filename("a.txt");
        let request = request("POST", "/upload")
            .with_content("multipart/form-data", Payload::fields([("field", "value")]))
            .unwrap()
            .with_uploaded_file("upload", file);

        let body = String::from_utf8(request.body().unwrap().to_bytes().unwrap().to_vec()).unwrap();
        assert_eq!(body.matches("Content-Disposition").count(), 2);
        assert!(body.contains("name=\"upload\"; filename=\"a.txt\""));
    }

    #[test]
    fn multipart_with_uploaded_file_list() {
        let files = vec![
            UploadedFile::from_stream(factory::create_stream("1")).with_client_filename("1.txt"),
            UploadedFile::from_stream(factory::create_stream("2")).with_client_filename("2.txt"),
        ];
        let request = request("PUT", "/").with_content_type("multipart/form-data").unwrap().with_uploaded_files([("files", files)]);

        let body = String::from_utf8(request.body().unwrap().to_bytes().unwrap().to_vec()).unwrap();
        assert_eq!(body.matches("name=\"files[]\"").count(), 2);
    }

    #[test]
    fn path_params_are_memoized_per_value() {
        let request = request("GET", "/users/7");

        assert_eq!(request.path_param("/users/{id}", "id").as_deref(), Some("7"));
        assert_eq!(request.path_param("/users/{user}", "user").as_deref(), Some("7"));
        assert_eq!(request.path_param("/users/{id}", "missing"), None);

        let moved = request.with_uri(Uri::parse("/users/8").unwrap(), false).unwrap();
        assert_eq!(moved.path_param("/users/{id}", "id").as_deref(), Some("8"));
    }

    #[test]
    fn attributes() {
        let request = request("GET", "/").with_attribute("user", json!({"id": 1}));
        assert_eq!(request.attribute("user"), Some(&json!({"id": 1})));

        let removed = request.without_attribute("user");
        assert!(removed.attribute("user").is_none());
        assert!(request.attribute("user").is_some());
    }

    #[test]
    fn header_mutators_clone() {
        let request = request("GET", "/").with_header("X-Key", "1").unwrap();
        let removed = request.without_header("x-key");

        assert!(!removed.has_header("X-Key"));
        assert!(request.has_header("X-Key"));
    }
}
