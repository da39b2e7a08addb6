//! Handler trait and type erasure.
//!
//! The route table holds handlers of *different* types in a single bucket, so
//! each one is wrapped in a trait object (`dyn ErasedHandler`) behind an
//! `Arc`:
//!
//! ```text
//! async fn get_user(req: Request, params: Params) -> Response { … }
//!        ↓ router.get("users/{int:id}", get_user)
//! get_user.into_boxed_handler()                ← Handler blanket impl
//!        ↓
//! Arc::new(FnHandler(get_user))                ← stored as BoxedHandler
//!        ↓
//! handler.call(req, params)  at request time   ← one vtable dispatch
//! ```
//!
//! A route registered for several methods shares the same `Arc` in every
//! method bucket.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::error::BoxError;
use crate::param::Params;
use crate::request::Request;
use crate::response::{IntoResponse, Response};

/// A heap-allocated, type-erased future resolving to a handler's reply.
pub(crate) type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send + 'static>>;

/// Internal dispatch interface.
///
/// `#[doc(hidden)] pub` because it appears in the return type of the public
/// [`Handler::into_boxed_handler`].
#[doc(hidden)]
pub trait ErasedHandler {
    fn call(&self, req: Request, params: Params) -> BoxFuture<Result<Response, BoxError>>;
}

/// A type-erased handler shared across concurrent requests.
#[doc(hidden)]
pub type BoxedHandler = Arc<dyn ErasedHandler + Send + Sync + 'static>;

// ── IntoReply ─────────────────────────────────────────────────────────────────

/// What a handler may return: anything [`IntoResponse`], or a `Result` whose
/// error is forwarded to the application's
/// [`ErrorReporter`](crate::ErrorReporter).
pub trait IntoReply {
    fn into_reply(self) -> Result<Response, BoxError>;
}

impl<T: IntoResponse> IntoReply for T {
    fn into_reply(self) -> Result<Response, BoxError> {
        Ok(self.into_response())
    }
}

impl<T, E> IntoReply for Result<T, E>
where
    T: IntoResponse,
    E: Into<BoxError>,
{
    fn into_reply(self) -> Result<Response, BoxError> {
        self.map(IntoResponse::into_response).map_err(Into::into)
    }
}

// ── Public Handler trait ──────────────────────────────────────────────────────

/// Implemented for every valid route handler.
///
/// Satisfied automatically by any `async fn` with the signature:
///
/// ```text
/// async fn name(req: Request, params: Params) -> impl IntoReply
/// ```
///
/// `params` holds the route's captures in pattern order. The trait is sealed.
pub trait Handler: private::Sealed + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed_handler(self) -> BoxedHandler;
}

mod private {
    pub trait Sealed {}
}

impl<F, Fut, R> private::Sealed for F
where
    F: Fn(Request, Params) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoReply + Send + 'static,
{
}

impl<F, Fut, R> Handler for F
where
    F: Fn(Request, Params) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoReply + Send + 'static,
{
    fn into_boxed_handler(self) -> BoxedHandler {
        Arc::new(FnHandler(self))
    }
}

/// Holds a concrete handler `F` and bridges it to [`ErasedHandler`].
struct FnHandler<F>(F);

impl<F, Fut, R> ErasedHandler for FnHandler<F>
where
    F: Fn(Request, Params) -> Fut + Send + Sync,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoReply + Send + 'static,
{
    fn call(&self, req: Request, params: Params) -> BoxFuture<Result<Response, BoxError>> {
        let fut = (self.0)(req, params);
        Box::pin(async move { fut.await.into_reply() })
    }
}

#[cfg(test)]
mod tests {
    use http::StatusCode;

    use super::*;
    use crate::method::Method;

    async fn ok(_req: Request, params: Params) -> String {
        format!("{} params", params.len())
    }

    async fn failing(_req: Request, _params: Params) -> Result<Response, std::io::Error> {
        Err(std::io::Error::other("db down"))
    }

    async fn status(_req: Request, _params: Params) -> StatusCode {
        StatusCode::ACCEPTED
    }

    #[tokio::test]
    async fn erased_handlers_reply() {
        let req = Request::new(Method::Get, "/");

        let res = ok.into_boxed_handler().call(req.clone(), Params::new()).await.unwrap();
        assert_eq!(res.body().as_ref(), b"0 params");

        let res = status.into_boxed_handler().call(req.clone(), Params::new()).await.unwrap();
        assert_eq!(res.status_code(), StatusCode::ACCEPTED);

        let err = failing.into_boxed_handler().call(req, Params::new()).await.unwrap_err();
        assert_eq!(err.to_string(), "db down");
    }
}
