//! Middleware layer.
//!
//! A middleware runs before a handler and decides whether the request goes
//! any further by returning a [`Flow`]:
//!
//! ```rust
//! use tsuji::{Flow, Params, Request, Response};
//! use http::StatusCode;
//!
//! async fn require_token(req: Request, params: Params) -> Flow {
//!     match req.header("authorization") {
//!         Some(_) => Flow::Continue(params),
//!         None => Flow::Respond(Response::status(StatusCode::UNAUTHORIZED)),
//!     }
//! }
//! ```
//!
//! There is no continuation callback to forget: a middleware that does not
//! return `Continue` stops the chain. `Halt` without a response makes the
//! dispatcher finalize an empty `200`.

mod chain;

use std::future::Future;
use std::sync::Arc;

use crate::error::BoxError;
use crate::handler::BoxFuture;
use crate::param::Params;
use crate::request::Request;
use crate::response::Response;

pub(crate) use chain::{ChainOutcome, run};

/// What a middleware decided.
#[derive(Debug)]
pub enum Flow {
    /// Proceed. The params are handed to the next middleware, and to the
    /// handler once the chain completes.
    Continue(Params),
    /// Stop here; nothing further runs.
    Halt,
    /// Stop here and answer with this response.
    Respond(Response),
}

/// What a middleware may return: a [`Flow`], or a `Result` whose error is
/// forwarded to the application's [`ErrorReporter`](crate::ErrorReporter).
pub trait IntoFlow {
    fn into_flow(self) -> Result<Flow, BoxError>;
}

impl IntoFlow for Flow {
    fn into_flow(self) -> Result<Flow, BoxError> {
        Ok(self)
    }
}

impl<E: Into<BoxError>> IntoFlow for Result<Flow, E> {
    fn into_flow(self) -> Result<Flow, BoxError> {
        self.map_err(Into::into)
    }
}

#[doc(hidden)]
pub trait ErasedMiddleware {
    fn call(&self, req: Request, params: Params) -> BoxFuture<Result<Flow, BoxError>>;
}

#[doc(hidden)]
pub type BoxedMiddleware = Arc<dyn ErasedMiddleware + Send + Sync + 'static>;

/// Implemented for every `async fn(Request, Params) -> impl IntoFlow`.
pub trait Middleware: private::Sealed + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed_middleware(self) -> BoxedMiddleware;
}

mod private {
    pub trait Sealed {}
}

impl<F, Fut, R> private::Sealed for F
where
    F: Fn(Request, Params) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoFlow + Send + 'static,
{
}

impl<F, Fut, R> Middleware for F
where
    F: Fn(Request, Params) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoFlow + Send + 'static,
{
    fn into_boxed_middleware(self) -> BoxedMiddleware {
        Arc::new(FnMiddleware(self))
    }
}

struct FnMiddleware<F>(F);

impl<F, Fut, R> ErasedMiddleware for FnMiddleware<F>
where
    F: Fn(Request, Params) -> Fut + Send + Sync,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoFlow + Send + 'static,
{
    fn call(&self, req: Request, params: Params) -> BoxFuture<Result<Flow, BoxError>> {
        let fut = (self.0)(req, params);
        Box::pin(async move { fut.await.into_flow() })
    }
}

/// An ordered list of middlewares, run first to last.
///
/// ```rust
/// use tsuji::{Flow, Middlewares, Params, Request};
///
/// async fn audit(_req: Request, params: Params) -> Flow { Flow::Continue(params) }
/// async fn auth(_req: Request, params: Params) -> Flow { Flow::Continue(params) }
///
/// let chain = Middlewares::new().with(audit).with(auth);
/// assert_eq!(chain.len(), 2);
/// ```
#[derive(Clone, Default)]
pub struct Middlewares(Vec<BoxedMiddleware>);

impl Middlewares {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Appends `middleware` to the end of the chain.
    pub fn with(mut self, middleware: impl Middleware) -> Self {
        self.push(middleware);
        self
    }

    pub fn push(&mut self, middleware: impl Middleware) {
        self.0.push(middleware.into_boxed_middleware());
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub(crate) fn iter(&self) -> std::slice::Iter<'_, BoxedMiddleware> {
        self.0.iter()
    }
}

impl std::fmt::Debug for Middlewares {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Middlewares").field("len", &self.0.len()).finish()
    }
}
