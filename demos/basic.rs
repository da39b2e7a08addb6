//! Minimal tsuji example: a main table, a mounted API table with a token
//! check, typed captures and a custom fallback.
//!
//! Run with:
//!   RUST_LOG=debug cargo run --example basic
//!
//! Try:
//!   curl http://localhost:3000/
//!   curl -H 'authorization: secret' http://localhost:3000/api/users/42
//!   curl -X POST -H 'authorization: secret' http://localhost:3000/api/users -d '{"name":"alice"}'
//!   curl http://localhost:3000/api/flights/nga-usa
//!   curl http://localhost:3000/api/files/docs/readme.md
//!   curl http://localhost:3000/nowhere

use http::StatusCode;
use tsuji::{App, Flow, Method, MethodSet, Middlewares, Params, Request, Response, Router, Server};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let mut main = Router::new();
    main.get("", |_req: Request, _p: Params| async { "tsuji is up" });

    let mut api = Router::new();
    api.get("users/{int:id}", get_user);
    api.post("users", create_user);
    api.delete("users/{int:id}", |_req: Request, _p: Params| async { StatusCode::NO_CONTENT });
    api.get("flights/{from}-{to}", flights);
    api.get("files/*", file);
    api.use_middleware("users", Middlewares::new().with(require_token), MethodSet::ALL)
        .expect("valid prefix");
    api.use_middleware("", Middlewares::new().with(audit_delete), Method::Delete)
        .expect("valid prefix");

    let mut app = App::new(main).with_fallback(|req: Request, _p: Params| async move {
        Response::builder()
            .status(StatusCode::NOT_FOUND)
            .text(format!("nothing at {}", req.path()))
    });
    app.mount("/api", api).expect("valid base path");

    Server::bind(([0, 0, 0, 0], 3000).into())
        .serve(app)
        .await
        .expect("server error");
}

// GET /api/users/{int:id}
async fn get_user(_req: Request, params: Params) -> Response {
    let id = params[0].as_int().unwrap_or_default();
    Response::json(format!(r#"{{"id":{id},"name":"alice"}}"#))
}

// POST /api/users
async fn create_user(req: Request, _params: Params) -> Response {
    if req.body().is_empty() {
        return Response::status(StatusCode::BAD_REQUEST);
    }
    Response::builder()
        .status(StatusCode::CREATED)
        .header("location", "/api/users/99")
        .json(r#"{"id":99}"#)
}

// GET /api/flights/{from}-{to}
async fn flights(_req: Request, params: Params) -> String {
    format!("from {} to {}", params[0], params[1])
}

// GET /api/files/*
async fn file(_req: Request, params: Params) -> String {
    format!("serving {}", params.wildcard().unwrap_or_default())
}

async fn require_token(req: Request, params: Params) -> Flow {
    match req.header("authorization") {
        Some("secret") => Flow::Continue(params),
        _ => Flow::Respond(Response::status(StatusCode::UNAUTHORIZED)),
    }
}

// Bound to DELETE only.
async fn audit_delete(req: Request, params: Params) -> Flow {
    tracing::info!(path = req.path(), "delete requested");
    Flow::Continue(params)
}
