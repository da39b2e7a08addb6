//! Route table.
//!
//! One ordered bucket per HTTP method plus an ordered list of middleware
//! bindings. Order is registration order and it is the only tie-break: when
//! two routes match the same path, the one registered first wins no matter
//! how specific the other one is.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::trace;

use crate::error::Error;
use crate::handler::{BoxedHandler, Handler};
use crate::method::{Method, MethodSet};
use crate::middleware::Middlewares;
use crate::pattern::{self, Pattern};

/// Identifier returned when a route is registered.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct RouteId(u64);

/// Identifier returned when a middleware binding is registered.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct MiddlewareId(u64);

/// Monotonic identifier source.
///
/// Every [`Router`] owns one. Clone it into [`Router::with_ids`] when several
/// tables should draw from the same sequence.
#[derive(Clone, Debug, Default)]
pub struct IdSequence(Arc<AtomicU64>);

impl IdSequence {
    pub fn new() -> Self {
        Self::default()
    }

    fn next(&self) -> u64 {
        self.0.fetch_add(1, Ordering::Relaxed) + 1
    }
}

/// A registered route. Shared between every method bucket it was
/// registered for.
pub struct Route {
    id: RouteId,
    pattern: Pattern,
    methods: MethodSet,
    handler: BoxedHandler,
    middlewares: Middlewares,
}

impl Route {
    pub fn id(&self) -> RouteId { self.id }
    pub fn pattern(&self) -> &Pattern { &self.pattern }
    pub fn methods(&self) -> MethodSet { self.methods }
    pub fn middlewares(&self) -> &Middlewares { &self.middlewares }
    pub(crate) fn handler(&self) -> &BoxedHandler { &self.handler }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("id", &self.id)
            .field("pattern", &self.pattern.as_str())
            .field("methods", &self.methods)
            .field("middlewares", &self.middlewares.len())
            .finish_non_exhaustive()
    }
}

/// A middleware chain bound to a path prefix and a set of methods.
#[derive(Debug)]
pub struct MiddlewareBinding {
    id: MiddlewareId,
    pattern: Pattern,
    methods: MethodSet,
    chain: Middlewares,
}

impl MiddlewareBinding {
    pub fn id(&self) -> MiddlewareId { self.id }
    pub fn pattern(&self) -> &Pattern { &self.pattern }
    pub fn methods(&self) -> MethodSet { self.methods }
    pub fn chain(&self) -> &Middlewares { &self.chain }

    /// Whether this binding applies to a request.
    pub fn applies_to(&self, method: Method, path: &str) -> bool {
        self.methods.contains(method) && self.pattern.matches(path)
    }
}

/// The route table.
///
/// ```rust
/// use tsuji::{Params, Request, Router};
///
/// async fn list(_req: Request, _params: Params) -> &'static str { "[]" }
///
/// let mut api = Router::new();
/// api.set_base_path("/api");
/// let id = api.get("users", list);
///
/// assert_eq!(api.route_count(), 1);
/// assert!(api.remove_route(id));
/// assert_eq!(api.route_count(), 0);
/// ```
pub struct Router {
    ids: IdSequence,
    buckets: [Vec<Arc<Route>>; Method::COUNT],
    middlewares: Vec<MiddlewareBinding>,
    base_path: String,
    inherit_middlewares: bool,
}

macro_rules! method_routes {
    ($($verb:ident, $verb_with:ident => $method:expr;)+) => {
        $(
            /// Registers `handler` for this method. See [`Router::route`].
            ///
            /// # Panics
            ///
            /// Panics if `path` is not a valid pattern.
            pub fn $verb(&mut self, path: &str, handler: impl Handler) -> RouteId {
                self.$verb_with(path, Middlewares::new(), handler)
            }

            /// Like the plain verb, with route-local middlewares.
            ///
            /// # Panics
            ///
            /// Panics if `path` is not a valid pattern.
            pub fn $verb_with(&mut self, path: &str, middlewares: Middlewares, handler: impl Handler) -> RouteId {
                self.route($method, path, handler, middlewares)
                    .unwrap_or_else(|e| panic!("invalid route `{path}`: {e}"))
            }
        )+
    };
}

impl Router {
    pub fn new() -> Self {
        Self::with_ids(IdSequence::new())
    }

    /// A table drawing identifiers from `ids`.
    pub fn with_ids(ids: IdSequence) -> Self {
        Self {
            ids,
            buckets: Default::default(),
            middlewares: Vec::new(),
            base_path: String::new(),
            inherit_middlewares: true,
        }
    }

    method_routes! {
        get, get_with         => Method::Get;
        post, post_with       => Method::Post;
        put, put_with         => Method::Put;
        delete, delete_with   => Method::Delete;
        head, head_with       => Method::Head;
        options, options_with => Method::Options;
        any, any_with         => MethodSet::ALL;
    }

    /// Registers a route for `methods` and returns its identifier.
    ///
    /// `path` is joined to the current base path. An empty method set means
    /// every method. A route registered for several methods is one logical
    /// entry present in each of their buckets.
    pub fn route(
        &mut self,
        methods: impl Into<MethodSet>,
        path: &str,
        handler: impl Handler,
        middlewares: Middlewares,
    ) -> Result<RouteId, Error> {
        let pattern = Pattern::parse(&pattern::join(&self.base_path, path))?;
        let methods = non_empty(methods.into());
        let id = RouteId(self.ids.next());

        trace!(?id, pattern = %pattern, ?methods, "route registered");

        let route = Arc::new(Route {
            id,
            pattern,
            methods,
            handler: handler.into_boxed_handler(),
            middlewares,
        });
        for method in methods.iter() {
            self.buckets[method.index()].push(Arc::clone(&route));
        }
        Ok(id)
    }

    /// Binds a middleware chain to every path starting with `path`, for
    /// `methods` (empty means every method).
    pub fn use_middleware(
        &mut self,
        path: &str,
        chain: Middlewares,
        methods: impl Into<MethodSet>,
    ) -> Result<MiddlewareId, Error> {
        let pattern = Pattern::prefix(&pattern::join(&self.base_path, path))?;
        let methods = non_empty(methods.into());
        let id = MiddlewareId(self.ids.next());

        trace!(?id, pattern = %pattern, ?methods, len = chain.len(), "middleware registered");

        self.middlewares.push(MiddlewareBinding { id, pattern, methods, chain });
        Ok(id)
    }

    /// Removes the route from every bucket it lives in.
    pub fn remove_route(&mut self, id: RouteId) -> bool {
        let mut removed = false;
        for bucket in &mut self.buckets {
            if let Some(pos) = bucket.iter().position(|r| r.id == id) {
                bucket.remove(pos);
                removed = true;
            }
        }
        removed
    }

    pub fn remove_middleware(&mut self, id: MiddlewareId) -> bool {
        match self.middlewares.iter().position(|m| m.id == id) {
            Some(pos) => {
                self.middlewares.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Routes registered for `method`, in registration order.
    pub fn routes(&self, method: Method) -> &[Arc<Route>] {
        &self.buckets[method.index()]
    }

    /// Number of logical routes, counting multi-method routes once.
    pub fn route_count(&self) -> usize {
        self.buckets
            .iter()
            .flatten()
            .map(|r| r.id)
            .collect::<HashSet<_>>()
            .len()
    }

    /// Middleware bindings, in registration order.
    pub fn middlewares(&self) -> &[MiddlewareBinding] {
        &self.middlewares
    }

    /// Prefix applied to paths registered from now on. Entries already
    /// registered keep their pattern.
    pub fn set_base_path(&mut self, path: &str) {
        self.base_path = pattern::normalize(path);
    }

    /// The sequence this table draws identifiers from.
    pub fn ids(&self) -> &IdSequence {
        &self.ids
    }

    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    /// Whether this table runs the parent's global middlewares ahead of its
    /// own when mounted. Defaults to `true`.
    pub fn inherits_middlewares(&self) -> bool {
        self.inherit_middlewares
    }

    pub fn inherit_middlewares(&mut self, inherit: bool) -> &mut Self {
        self.inherit_middlewares = inherit;
        self
    }

    /// Reads the inherit flag, replacing it first when `update` is given.
    pub fn should_inherit_middlewares(&mut self, update: Option<bool>) -> bool {
        if let Some(inherit) = update {
            self.inherit_middlewares = inherit;
        }
        self.inherit_middlewares
    }

    /// Moves every registered entry, and the base path, under `prefix`.
    pub(crate) fn rebase(&mut self, prefix: &str) -> Result<(), Error> {
        let mut rebuilt: HashMap<RouteId, Arc<Route>> = HashMap::new();
        let mut buckets: [Vec<Arc<Route>>; Method::COUNT] = Default::default();

        for (index, bucket) in self.buckets.iter().enumerate() {
            for route in bucket {
                let moved = match rebuilt.get(&route.id) {
                    Some(moved) => Arc::clone(moved),
                    None => {
                        let moved = Arc::new(Route {
                            id: route.id,
                            pattern: route.pattern.rebase(prefix)?,
                            methods: route.methods,
                            handler: Arc::clone(&route.handler),
                            middlewares: route.middlewares.clone(),
                        });
                        rebuilt.insert(route.id, Arc::clone(&moved));
                        moved
                    }
                };
                buckets[index].push(moved);
            }
        }

        let middlewares = self
            .middlewares
            .iter()
            .map(|m| -> Result<MiddlewareBinding, Error> {
                Ok(MiddlewareBinding {
                    id: m.id,
                    pattern: m.pattern.rebase(prefix)?,
                    methods: m.methods,
                    chain: m.chain.clone(),
                })
            })
            .collect::<Result<Vec<_>, Error>>()?;

        self.buckets = buckets;
        self.middlewares = middlewares;
        self.base_path = pattern::join(prefix, &self.base_path);
        Ok(())
    }
}

impl Default for Router {
    fn default() -> Self { Self::new() }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("base_path", &self.base_path)
            .field("routes", &self.route_count())
            .field("middlewares", &self.middlewares.len())
            .field("inherit_middlewares", &self.inherit_middlewares)
            .finish()
    }
}

fn non_empty(methods: MethodSet) -> MethodSet {
    if methods.is_empty() { MethodSet::ALL } else { methods }
}
