//! Request middleware.
//!
//! A [`MiddlewareChain`] runs its middlewares in order. Each middleware receives the request
//! and a [`Next`] continuation: it can change the request before calling
//! [`Next::run`], change the response after it, or answer on its own without calling it.
//! After the last middleware, the request reaches the terminal [`RequestHandler`], usually
//! an [`HttpClient`].

use micro_message::{Request, Response};
use tracing::trace;

use crate::{ClientError, HttpClient, Transport};

/// The end of a middleware chain.
pub trait RequestHandler {
    /// # Errors
    ///
    /// Whatever the handler fails with, typically a [`ClientError`] from the transport.
    fn handle(&mut self, request: Request) -> Result<Response, ClientError>;
}

impl<T: Transport> RequestHandler for HttpClient<T> {
    fn handle(&mut self, request: Request) -> Result<Response, ClientError> {
        self.send_request(&request)
    }
}

/// One step of a [`MiddlewareChain`].
pub trait Middleware {
    /// # Errors
    ///
    /// Returns the error of the rest of the chain, or one of its own.
    fn process(&self, request: Request, next: Next<'_>) -> Result<Response, ClientError>;
}

impl<F> Middleware for F
where
    F: Fn(Request, Next<'_>) -> Result<Response, ClientError>,
{
    fn process(&self, request: Request, next: Next<'_>) -> Result<Response, ClientError> {
        self(request, next)
    }
}

/// The rest of the chain after the current middleware.
pub struct Next<'a> {
    middlewares: &'a [Box<dyn Middleware>],
    handler: &'a mut dyn RequestHandler,
}

impl Next<'_> {
    /// Passes `request` to the next middleware, or to the handler after the last one.
    ///
    /// # Errors
    ///
    /// Returns the error of the next middleware or of the handler.
    pub fn run(self, request: Request) -> Result<Response, ClientError> {
        match self.middlewares.split_first() {
            Some((current, rest)) => current.process(request, Next { middlewares: rest, handler: self.handler }),
            None => self.handler.handle(request),
        }
    }
}

impl std::fmt::Debug for Next<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Next").field("remaining", &self.middlewares.len()).finish_non_exhaustive()
    }
}

/// An ordered list of middlewares in front of a [`RequestHandler`].
///
/// ```
/// use micro_client::middleware::{MiddlewareChain, Next, RequestHandler};
/// use micro_client::ClientError;
/// use micro_message::{Request, Response};
///
/// struct Fixed;
///
/// impl RequestHandler for Fixed {
///     fn handle(&mut self, _request: Request) -> Result<Response, ClientError> {
///         Ok(Response::new(200)?)
///     }
/// }
///
/// let chain = MiddlewareChain::new().with(|request: Request, next: Next<'_>| -> Result<Response, ClientError> {
///     next.run(request.with_header("X-Request-Id", "42")?)
/// });
///
/// let response = chain.handle(Request::new("GET", "http://localhost/").unwrap(), &mut Fixed).unwrap();
/// assert_eq!(response.status(), 200);
/// ```
#[derive(Default)]
pub struct MiddlewareChain {
    middlewares: Vec<Box<dyn Middleware>>,
}

impl MiddlewareChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a middleware; it runs after the ones already added.
    #[must_use]
    pub fn with<M: Middleware + 'static>(mut self, middleware: M) -> Self {
        self.middlewares.push(Box::new(middleware));
        self
    }

    /// Prepends a middleware; it runs before the ones already added.
    #[must_use]
    pub fn with_first<M: Middleware + 'static>(mut self, middleware: M) -> Self {
        self.middlewares.insert(0, Box::new(middleware));
        self
    }

    pub fn len(&self) -> usize {
        self.middlewares.len()
    }

    pub fn is_empty(&self) -> bool {
        self.middlewares.is_empty()
    }

    /// Runs `request` through every middleware and then `handler`.
    ///
    /// # Errors
    ///
    /// Returns the first error a middleware or the handler returns.
    pub fn handle(&self, request: Request, handler: &mut dyn RequestHandler) -> Result<Response, ClientError> {
        trace!(middlewares = self.middlewares.len(), "running middleware chain");
        Next { middlewares: &self.middlewares, handler }.run(request)
    }
}

impl std::fmt::Debug for MiddlewareChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MiddlewareChain").field("len", &self.middlewares.len()).finish()
    }
}
