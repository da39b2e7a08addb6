//! Sequential middleware execution.

use tracing::debug;

use super::{Flow, Middlewares};
use crate::error::BoxError;
use crate::param::Params;
use crate::request::Request;
use crate::response::Response;

/// How a chain ended.
#[derive(Debug)]
pub(crate) enum ChainOutcome {
    /// Every middleware continued; carries the params the last one passed on.
    Completed(Params),
    /// A middleware stopped the chain, optionally with its own response.
    Halted(Option<Response>),
}

/// Runs `chain` in order, one middleware at a time.
///
/// The first middleware that does not continue ends the run; nothing after it
/// is called. Errors stop the run and are returned as-is.
pub(crate) async fn run(
    chain: &Middlewares,
    req: &Request,
    mut params: Params,
) -> Result<ChainOutcome, BoxError> {
    for (position, middleware) in chain.iter().enumerate() {
        match middleware.call(req.clone(), params).await? {
            Flow::Continue(next) => params = next,
            Flow::Halt => {
                debug!(position, "middleware halted");
                return Ok(ChainOutcome::Halted(None));
            }
            Flow::Respond(res) => {
                debug!(position, status = %res.status_code(), "middleware responded");
                return Ok(ChainOutcome::Halted(Some(res)));
            }
        }
    }
    Ok(ChainOutcome::Completed(params))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use http::StatusCode;

    use super::*;
    use crate::method::Method;
    use crate::param::{Captured, ParamType, Value};

    fn counting(hits: &Arc<AtomicUsize>, flow: fn(Params) -> Flow) -> Middlewares {
        let hits = Arc::clone(hits);
        Middlewares::new().with(move |_req: Request, params: Params| {
            let hits = Arc::clone(&hits);
            async move {
                hits.fetch_add(1, Ordering::SeqCst);
                flow(params)
            }
        })
    }

    fn chain_of(parts: Vec<Middlewares>) -> Middlewares {
        let mut chain = Middlewares::new();
        for part in parts {
            chain.0.extend(part.0);
        }
        chain
    }

    #[tokio::test]
    async fn empty_chain_completes() {
        let req = Request::new(Method::Get, "/");
        let outcome = run(&Middlewares::new(), &req, Params::new()).await.unwrap();
        assert!(matches!(outcome, ChainOutcome::Completed(p) if p.is_empty()));
    }

    #[tokio::test]
    async fn halt_stops_later_middlewares() {
        let hits = Arc::new(AtomicUsize::new(0));
        let chain = chain_of(vec![
            counting(&hits, Flow::Continue),
            counting(&hits, |_| Flow::Halt),
            counting(&hits, Flow::Continue),
        ]);

        let req = Request::new(Method::Get, "/");
        let outcome = run(&chain, &req, Params::new()).await.unwrap();
        assert!(matches!(outcome, ChainOutcome::Halted(None)));
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn respond_carries_the_response() {
        let hits = Arc::new(AtomicUsize::new(0));
        let chain = chain_of(vec![
            counting(&hits, |_| Flow::Respond(Response::status(StatusCode::FORBIDDEN))),
            counting(&hits, Flow::Continue),
        ]);

        let req = Request::new(Method::Get, "/");
        let outcome = run(&chain, &req, Params::new()).await.unwrap();
        let ChainOutcome::Halted(Some(res)) = outcome else { panic!("expected a response") };
        assert_eq!(res.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn continue_passes_params_along() {
        let chain = Middlewares::new()
            .with(|_req: Request, mut params: Params| async move {
                params.push(Captured { name: "user".into(), kind: ParamType::Str, value: Value::Str("ada".into()) });
                Flow::Continue(params)
            })
            .with(|_req: Request, params: Params| async move {
                assert_eq!(params.get("user"), Some(&Value::Str("ada".into())));
                Flow::Continue(params)
            });

        let req = Request::new(Method::Get, "/");
        let outcome = run(&chain, &req, Params::new()).await.unwrap();
        assert!(matches!(outcome, ChainOutcome::Completed(p) if p.len() == 1));
    }

    #[tokio::test]
    async fn errors_propagate() {
        let chain = Middlewares::new()
            .with(|_req: Request, _params: Params| async move {
                Err::<Flow, _>(std::io::Error::other("boom"))
            });

        let req = Request::new(Method::Get, "/");
        let err = run(&chain, &req, Params::new()).await.unwrap_err();
        assert_eq!(err.to_string(), "boom");
    }
}
