use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use http::StatusCode;
use tsuji::{
    App, BoxError, Dispatch, Flow, Handler, LogReporter, Method, MethodSet, Middleware, Middlewares,
    Params, Request, Response, RouteId, Router,
};

fn counted(hits: &Arc<AtomicUsize>, body: &'static str) -> impl Handler {
    let hits = Arc::clone(hits);
    move |_req: Request, _params: Params| {
        let hits = Arc::clone(&hits);
        async move {
            hits.fetch_add(1, Ordering::SeqCst);
            body
        }
    }
}

fn tagging(log: &Arc<Mutex<Vec<&'static str>>>, tag: &'static str) -> impl Middleware {
    let log = Arc::clone(log);
    move |_req: Request, params: Params| {
        let log = Arc::clone(&log);
        async move {
            log.lock().unwrap().push(tag);
            Flow::Continue(params)
        }
    }
}

async fn get(app: &App, target: &str) -> Response {
    app.handle(Request::new(Method::Get, target)).await
}

#[tokio::test]
async fn mounted_table_is_tried_after_main() {
    let main_hits = Arc::new(AtomicUsize::new(0));
    let admin_hits = Arc::new(AtomicUsize::new(0));
    let log = Arc::new(Mutex::new(Vec::new()));

    let mut main = Router::new();
    main.get("home", counted(&main_hits, "home"));
    main.use_middleware("", Middlewares::new().with(tagging(&log, "main")), MethodSet::ALL).unwrap();

    let mut admin = Router::new();
    admin.get("dashboard", counted(&admin_hits, "dashboard"));
    admin.use_middleware("", Middlewares::new().with(tagging(&log, "admin")), MethodSet::ALL).unwrap();

    let mut app = App::new(main);
    app.mount("/admin", admin).unwrap();

    let res = get(&app, "/admin/dashboard").await;
    assert_eq!(res.body().as_ref(), b"dashboard");
    assert_eq!(main_hits.load(Ordering::SeqCst), 0);
    assert_eq!(admin_hits.load(Ordering::SeqCst), 1);

    // main globals run for the main attempt, then again ahead of the
    // mounted table's own bindings because it inherits them.
    assert_eq!(*log.lock().unwrap(), ["main", "main", "admin"]);
}

#[tokio::test]
async fn main_match_stops_the_walk() {
    let main_hits = Arc::new(AtomicUsize::new(0));
    let child_hits = Arc::new(AtomicUsize::new(0));

    let mut main = Router::new();
    main.get("shop/{item}", counted(&main_hits, "main"));

    let mut shop = Router::new();
    shop.get("{item}", counted(&child_hits, "child"));

    let mut app = App::new(main);
    app.mount("shop", shop).unwrap();

    let res = get(&app, "/shop/hat").await;
    assert_eq!(res.body().as_ref(), b"main");
    assert_eq!(main_hits.load(Ordering::SeqCst), 1);
    assert_eq!(child_hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn non_inheriting_mount_skips_main_globals() {
    let log = Arc::new(Mutex::new(Vec::new()));

    let mut main = Router::new();
    main.use_middleware("", Middlewares::new().with(tagging(&log, "main")), MethodSet::ALL).unwrap();

    let mut public = Router::new();
    public.get("status", |_req: Request, _p: Params| async { "up" });
    public.inherit_middlewares(false);

    let mut app = App::new(main);
    app.mount("public", public).unwrap();

    let res = get(&app, "/public/status").await;
    assert_eq!(res.body().as_ref(), b"up");
    assert_eq!(*log.lock().unwrap(), ["main"]);
}

#[tokio::test]
async fn unmatched_requests_fall_back() {
    let app = App::new(Router::new());
    assert_eq!(get(&app, "/nowhere").await.status_code(), StatusCode::NOT_FOUND);

    let app = App::new(Router::new())
        .with_fallback(|req: Request, _p: Params| async move { format!("no page at {}", req.path()) });
    assert_eq!(get(&app, "/Missing?x=1").await.body().as_ref(), b"no page at /Missing");
}

#[tokio::test]
async fn halting_global_middleware_finalizes_empty_response() {
    let hits = Arc::new(AtomicUsize::new(0));

    let mut main = Router::new();
    main.get("report", counted(&hits, "report"));
    main.use_middleware(
        "",
        Middlewares::new().with(|_req: Request, _p: Params| async { Flow::Halt }),
        MethodSet::ALL,
    )
    .unwrap();

    let app = App::new(main);
    let res = get(&app, "/report").await;
    assert_eq!(res.status_code(), StatusCode::OK);
    assert!(res.body().is_empty());
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn denied_request_never_reaches_a_mounted_handler() {
    let hits = Arc::new(AtomicUsize::new(0));

    let mut main = Router::new();
    main.use_middleware(
        "",
        Middlewares::new().with(|_req: Request, _p: Params| async {
            Flow::Respond(Response::status(StatusCode::UNAUTHORIZED))
        }),
        MethodSet::ALL,
    )
    .unwrap();

    let mut admin = Router::new();
    admin.delete("users/{int:id}", counted(&hits, "deleted"));
    admin.inherit_middlewares(false);

    let mut app = App::new(main);
    app.mount("admin", admin).unwrap();

    let res = app.handle(Request::new(Method::Delete, "/admin/users/1")).await;
    assert_eq!(res.status_code(), StatusCode::UNAUTHORIZED);
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn halt_in_main_table_skips_mounted_middlewares() {
    let log = Arc::new(Mutex::new(Vec::new()));

    let mut main = Router::new();
    main.use_middleware(
        "gate",
        Middlewares::new().with(|_req: Request, _p: Params| async { Flow::Halt }),
        MethodSet::ALL,
    )
    .unwrap();

    let mut gate = Router::new();
    gate.get("open", |_req: Request, _p: Params| async { "open" });
    gate.use_middleware("", Middlewares::new().with(tagging(&log, "gate")), MethodSet::ALL).unwrap();

    let mut app = App::new(main);
    app.mount("gate", gate).unwrap();

    let res = get(&app, "/gate/open").await;
    assert!(res.body().is_empty());
    assert!(log.lock().unwrap().is_empty());
}

#[tokio::test]
async fn removed_route_no_longer_dispatches() {
    let mut router = Router::new();
    let before = router.route_count();
    let id = router.get("temp", |_req: Request, _p: Params| async { "temp" });
    assert!(router.remove_route(id));
    assert_eq!(router.route_count(), before);

    let mut ctx = Dispatch::new(Request::new(Method::Get, "/temp"), Arc::new(LogReporter));
    let globals: Vec<_> = router.middlewares().iter().collect();
    assert!(!ctx.process(router.routes(Method::Get), &globals).await);
}

#[tokio::test]
async fn removed_middleware_no_longer_runs() {
    let log = Arc::new(Mutex::new(Vec::new()));

    let mut main = Router::new();
    main.get("", |_req: Request, _p: Params| async { "root" });
    let id = main.use_middleware("", Middlewares::new().with(tagging(&log, "mw")), MethodSet::ALL).unwrap();
    assert!(main.remove_middleware(id));

    let app = App::new(main);
    assert_eq!(get(&app, "/").await.body().as_ref(), b"root");
    assert!(log.lock().unwrap().is_empty());
}

#[tokio::test]
async fn handler_errors_use_the_app_reporter() {
    let mut main = Router::new();
    main.get("fail", |_req: Request, _p: Params| async {
        Err::<Response, _>(std::io::Error::other("disk full"))
    });

    let app = App::new(main).with_reporter(|_req: &Request, err: BoxError| {
        Response::builder().status(StatusCode::SERVICE_UNAVAILABLE).text(err.to_string())
    });

    let res = get(&app, "/fail").await;
    assert_eq!(res.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(res.body().as_ref(), b"disk full");
}

#[tokio::test]
async fn method_buckets_are_separate() {
    let mut main = Router::new();
    main.get("items", |_req: Request, _p: Params| async { "list" });
    main.post("items", |_req: Request, _p: Params| async { StatusCode::CREATED });

    let app = App::new(main);
    let created = app.handle(Request::new(Method::Post, "/items")).await;
    assert_eq!(created.status_code(), StatusCode::CREATED);

    let missing = app.handle(Request::new(Method::Put, "/items")).await;
    assert_eq!(missing.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn wildcard_and_float_captures_reach_the_handler() {
    let mut main = Router::new();
    main.get("api/{float:version}/*", |_req: Request, params: Params| async move {
        format!("{}|{}", params[0], params.wildcard().unwrap_or_default())
    });

    let app = App::new(main);
    let res = get(&app, "/api/1.5/user/1/profile").await;
    assert_eq!(res.body().as_ref(), b"1.5|user/1/profile");
}

#[test]
fn tables_from_the_app_share_identifiers() {
    let mut main = Router::new();
    let home = main.get("home", |_req: Request, _p: Params| async { "home" });

    let mut app = App::new(main);
    let mut admin = app.new_router();
    let dashboard = admin.get("dashboard", |_req: Request, _p: Params| async { "dashboard" });
    let mut public = app.new_router();
    let status = public.get("status", |_req: Request, _p: Params| async { "up" });

    app.mount("admin", admin).unwrap();
    app.mount("public", public).unwrap();

    let ids: Vec<RouteId> = std::iter::once(app.router())
        .chain(app.mounts())
        .flat_map(|table| table.routes(Method::Get).iter().map(|r| r.id()))
        .collect();
    assert_eq!(ids, [home, dashboard, status]);
    assert!(home != dashboard && dashboard != status && home != status);
}
