//! Fatal-error reporting.
//!
//! When a handler or middleware fails (returns an error or panics) the
//! dispatcher does not pick a status code itself. It hands the error to the
//! application's [`ErrorReporter`], and whatever response that returns is
//! sent. The request still counts as resolved: no fallback runs after it.

use http::StatusCode;
use tracing::error;

use crate::error::BoxError;
use crate::request::Request;
use crate::response::Response;

/// Turns a handler or middleware failure into a response.
///
/// Closures with the matching signature implement it:
///
/// ```rust
/// use http::StatusCode;
/// use tsuji::{App, Response, Router};
///
/// let app = App::new(Router::new())
///     .with_reporter(|_req: &tsuji::Request, err: tsuji::BoxError| {
///         Response::builder()
///             .status(StatusCode::SERVICE_UNAVAILABLE)
///             .text(err.to_string())
///     });
/// ```
pub trait ErrorReporter: Send + Sync + 'static {
    fn report_fatal(&self, req: &Request, error: BoxError) -> Response;
}

impl<F> ErrorReporter for F
where
    F: Fn(&Request, BoxError) -> Response + Send + Sync + 'static,
{
    fn report_fatal(&self, req: &Request, error: BoxError) -> Response {
        self(req, error)
    }
}

/// Default reporter: logs the error and answers `500` with no body.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogReporter;

impl ErrorReporter for LogReporter {
    fn report_fatal(&self, req: &Request, error: BoxError) -> Response {
        error!(method = %req.method(), path = req.path(), %error, "request failed");
        Response::status(StatusCode::INTERNAL_SERVER_ERROR)
    }
}
