//! # tsuji
//!
//! Request routing and middleware dispatch for small HTTP services.
//!
//! tsuji takes a request's method and path, finds the first registered route
//! that fits across a main table and any mounted tables, decodes the typed
//! captures in its pattern, runs the middlewares in front of it and calls
//! exactly one handler.
//!
//! - Patterns: literals, `{int:id}` captures, `{from}-{to}` pairs, an optional
//!   final capture `{page}?` and a `*` tail. See [`pattern`].
//! - Captures decode to strings, integers, floats or booleans and never fail.
//!   See [`param`].
//! - Routes are tried in registration order. The first match wins, even when
//!   a later route is more specific.
//! - Middlewares return a [`Flow`]: continue, halt, or answer directly.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use http::StatusCode;
//! use tsuji::{App, Flow, Middlewares, MethodSet, Params, Request, Response, Router, Server};
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut api = Router::new();
//!     api.get("users/{int:id}", get_user);
//!     api.use_middleware("", Middlewares::new().with(require_token), MethodSet::ALL)
//!         .expect("valid prefix");
//!
//!     let mut app = App::new(Router::new());
//!     app.mount("/api", api).expect("valid base path");
//!
//!     Server::bind(([0, 0, 0, 0], 3000).into()).serve(app).await.unwrap();
//! }
//!
//! async fn get_user(_req: Request, params: Params) -> String {
//!     format!(r#"{{"id":{}}}"#, params[0])
//! }
//!
//! async fn require_token(req: Request, params: Params) -> Flow {
//!     match req.header("authorization") {
//!         Some(_) => Flow::Continue(params),
//!         None => Flow::Respond(Response::status(StatusCode::UNAUTHORIZED)),
//!     }
//! }
//! ```

mod app;
mod error;
mod handler;
mod method;
mod report;
mod request;
mod response;
mod router;
mod server;

pub mod dispatch;
pub mod middleware;
pub mod param;
pub mod pattern;

pub use app::App;
pub use dispatch::Dispatch;
pub use error::{BoxError, Error};
pub use handler::{Handler, IntoReply};
pub use method::{Method, MethodSet};
pub use middleware::{Flow, IntoFlow, Middleware, Middlewares};
pub use param::{Captured, ParamType, Params, Value};
pub use pattern::Pattern;
pub use report::{ErrorReporter, LogReporter};
pub use request::Request;
pub use response::{ContentType, IntoResponse, Response, ResponseBuilder};
pub use router::{IdSequence, MiddlewareBinding, MiddlewareId, Route, RouteId, Router};
pub use server::Server;
