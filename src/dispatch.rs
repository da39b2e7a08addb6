//! Per-request dispatch.
//!
//! A [`Dispatch`] lives for exactly one request. It is tried against one or
//! more route tables by the caller (see [`App`](crate::App)) and becomes
//! *resolved* the first time a route matches. From then on every further
//! [`process`](Dispatch::process) call is a no-op returning `false`.
//!
//! A table attempt runs in three steps:
//!
//! 1. every active middleware binding whose prefix and method set fit the
//!    request, in order. A halt here ends the attempt with `false` but leaves
//!    the dispatch unresolved so the caller may still try another table.
//!    That attempt, and every later one, returns `false` without running
//!    anything: once a response is finalized no middleware or handler runs.
//! 2. the first route in the method bucket whose pattern matches. Matching
//!    resolves the dispatch.
//! 3. the route's own middlewares, then its handler.
//!
//! Errors and panics from middlewares and handlers go to the
//! [`ErrorReporter`] and the attempt still reports `true`.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tracing::{debug, trace, warn};

use crate::error::{BoxError, Error};
use crate::method::Method;
use crate::middleware::{self, ChainOutcome};
use crate::report::ErrorReporter;
use crate::request::Request;
use crate::response::Response;
use crate::router::{MiddlewareBinding, Route};

/// Lowercases the path component of a request target and strips the query,
/// the fragment and the surrounding slashes.
///
/// ```rust
/// assert_eq!(tsuji::dispatch::normalize_path("/Users/42/?tab=posts#top"), "users/42");
/// assert_eq!(tsuji::dispatch::normalize_path("/"), "");
/// ```
pub fn normalize_path(target: &str) -> String {
    let path = target.find(['?', '#']).map_or(target, |i| &target[..i]);
    path.trim_matches('/').to_lowercase()
}

/// Dispatch state for one request.
pub struct Dispatch {
    request: Request,
    path: String,
    method: Method,
    resolved: bool,
    response: Option<Response>,
    reporter: Arc<dyn ErrorReporter>,
}

impl Dispatch {
    pub fn new(request: Request, reporter: Arc<dyn ErrorReporter>) -> Self {
        let path = normalize_path(request.target());
        let method = request.method();
        Self { request, path, method, resolved: false, response: None, reporter }
    }

    /// The normalized path routes are matched against.
    pub fn path(&self) -> &str { &self.path }
    pub fn method(&self) -> Method { self.method }
    pub fn request(&self) -> &Request { &self.request }

    /// Whether a route has matched.
    pub fn is_resolved(&self) -> bool { self.resolved }

    /// Whether a response has been finalized.
    pub fn is_finished(&self) -> bool { self.response.is_some() }

    pub fn response(&self) -> Option<&Response> { self.response.as_ref() }

    pub fn into_response(self) -> Option<Response> { self.response }

    /// Tries one table: `middlewares` are its active bindings, `routes` its
    /// bucket for the request method.
    ///
    /// Returns `true` when a route matched in this table, even if its
    /// middleware halted or it failed.
    pub async fn process(&mut self, routes: &[Arc<Route>], middlewares: &[&MiddlewareBinding]) -> bool {
        if self.resolved {
            trace!(path = %self.path, "already resolved");
            return false;
        }
        // A middleware already answered: nothing else may run for this request.
        if self.is_finished() {
            trace!(path = %self.path, "response finalized, skipping table");
            return false;
        }

        for binding in middlewares {
            if !binding.applies_to(self.method, &self.path) {
                continue;
            }
            let params = binding.pattern().capture(&self.path);
            match guard(middleware::run(binding.chain(), &self.request, params)).await {
                Ok(ChainOutcome::Completed(_)) => {}
                Ok(ChainOutcome::Halted(res)) => {
                    debug!(path = %self.path, middleware = ?binding.id(), "middleware stopped the request");
                    self.finish(res.unwrap_or_else(Response::empty));
                    return false;
                }
                Err(err) => {
                    self.resolved = true;
                    self.fail(err);
                    return true;
                }
            }
        }

        let Some(route) = routes.iter().find(|r| r.pattern().matches(&self.path)) else {
            trace!(method = %self.method, path = %self.path, "no route in table");
            return false;
        };
        self.resolved = true;
        debug!(method = %self.method, path = %self.path, route = ?route.id(), pattern = %route.pattern(), "route matched");

        let params = route.pattern().capture(&self.path);
        match guard(middleware::run(route.middlewares(), &self.request, params)).await {
            Ok(ChainOutcome::Completed(params)) => {
                let call = async { route.handler().call(self.request.clone(), params).await };
                match guard(call).await {
                    Ok(res) => self.finish(res),
                    Err(err) => self.fail(err),
                }
            }
            Ok(ChainOutcome::Halted(res)) => {
                debug!(route = ?route.id(), "route middleware stopped the request");
                self.finish(res.unwrap_or_else(Response::empty));
            }
            Err(err) => self.fail(err),
        }
        true
    }

    /// Records the response. Only the first one counts.
    fn finish(&mut self, res: Response) {
        if self.response.is_some() {
            warn!(path = %self.path, status = %res.status_code(), "response already finalized, dropping");
            return;
        }
        self.response = Some(res);
    }

    fn fail(&mut self, err: BoxError) {
        let res = self.reporter.report_fatal(&self.request, err);
        self.finish(res);
    }
}

/// Converts a panic in `fut` into an error.
pub(crate) async fn guard<T>(fut: impl Future<Output = Result<T, BoxError>>) -> Result<T, BoxError> {
    match AssertUnwindSafe(fut).catch_unwind().await {
        Ok(result) => result,
        Err(panic) => Err(Error::Panicked(panic_message(panic.as_ref())).into()),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_owned())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "opaque panic payload".to_owned())
}
