//! The application: a main route table plus mounted tables.
//!
//! [`App::handle`] walks the tables in a fixed order with a single
//! [`Dispatch`]:
//!
//! 1. the main table, with its own middleware bindings;
//! 2. each mounted table in mount order, with its own bindings, preceded by
//!    the main table's bindings when the mounted table inherits them.
//!
//! The first table that resolves the request ends the walk, and so does a
//! middleware answering on its own. When neither happens, the fallback
//! handler runs.

use std::fmt;
use std::sync::Arc;

use http::StatusCode;
use tracing::trace;

use crate::dispatch::{self, Dispatch};
use crate::error::Error;
use crate::handler::{BoxedHandler, Handler};
use crate::param::Params;
use crate::report::{ErrorReporter, LogReporter};
use crate::request::Request;
use crate::response::Response;
use crate::router::{IdSequence, MiddlewareBinding, Router};

/// A routable application.
///
/// ```rust
/// use tsuji::{App, Params, Request, Router};
///
/// async fn dashboard(_req: Request, _params: Params) -> &'static str { "dashboard" }
///
/// let mut admin = Router::new();
/// admin.get("dashboard", dashboard);
///
/// let mut app = App::new(Router::new());
/// app.mount("/admin", admin).unwrap();
/// assert_eq!(app.mounts()[0].routes(tsuji::Method::Get)[0].pattern().as_str(), "admin/dashboard");
/// ```
pub struct App {
    ids: IdSequence,
    main: Router,
    mounts: Vec<Router>,
    reporter: Arc<dyn ErrorReporter>,
    fallback: BoxedHandler,
}

impl App {
    /// Wraps `main`. The app adopts `main`'s identifier sequence; tables
    /// from [`new_router`](Self::new_router) share it.
    pub fn new(main: Router) -> Self {
        Self {
            ids: main.ids().clone(),
            main,
            mounts: Vec::new(),
            reporter: Arc::new(LogReporter),
            fallback: not_found.into_boxed_handler(),
        }
    }

    /// Replaces the reporter that turns handler failures into responses.
    pub fn with_reporter(mut self, reporter: impl ErrorReporter) -> Self {
        self.reporter = Arc::new(reporter);
        self
    }

    /// Replaces the handler used when no table resolves a request
    /// (default: `404 Not Found`, no body).
    pub fn with_fallback(mut self, handler: impl Handler) -> Self {
        self.fallback = handler.into_boxed_handler();
        self
    }

    /// The main table.
    pub fn router(&self) -> &Router {
        &self.main
    }

    pub fn router_mut(&mut self) -> &mut Router {
        &mut self.main
    }

    /// An empty table drawing identifiers from the app's sequence, so its
    /// ids never collide with the main table's or another such table's.
    ///
    /// A table built with [`Router::new`] has a sequence of its own.
    pub fn new_router(&self) -> Router {
        Router::with_ids(self.ids.clone())
    }

    /// Attaches `child` under `base_url`. Everything already registered in
    /// `child` moves under the prefix.
    pub fn mount(&mut self, base_url: &str, mut child: Router) -> Result<&mut Self, Error> {
        child.rebase(base_url)?;
        trace!(base = child.base_path(), routes = child.route_count(), "table mounted");
        self.mounts.push(child);
        Ok(self)
    }

    /// Mounted tables, in mount order.
    pub fn mounts(&self) -> &[Router] {
        &self.mounts
    }

    /// Routes one request through every table and produces its response.
    pub async fn handle(&self, request: Request) -> Response {
        let mut ctx = Dispatch::new(request.clone(), Arc::clone(&self.reporter));
        let method = ctx.method();
        let globals: Vec<&MiddlewareBinding> = self.main.middlewares().iter().collect();

        let mut resolved = ctx.process(self.main.routes(method), &globals).await;

        for (index, child) in self.mounts.iter().enumerate() {
            if resolved || ctx.is_finished() {
                break;
            }
            let mut active = if child.inherits_middlewares() { globals.clone() } else { Vec::new() };
            active.extend(child.middlewares());

            trace!(mount = index, base = child.base_path(), "trying mounted table");
            resolved = ctx.process(child.routes(method), &active).await;
        }

        if let Some(res) = ctx.into_response() {
            return res;
        }

        trace!(%method, path = request.path(), "unresolved, using fallback");
        let call = async { self.fallback.call(request.clone(), Params::new()).await };
        match dispatch::guard(call).await {
            Ok(res) => res,
            Err(err) => self.reporter.report_fatal(&request, err),
        }
    }
}

impl fmt::Debug for App {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("App")
            .field("main", &self.main)
            .field("mounts", &self.mounts)
            .finish_non_exhaustive()
    }
}

async fn not_found(_req: Request, _params: Params) -> StatusCode {
    StatusCode::NOT_FOUND
}
