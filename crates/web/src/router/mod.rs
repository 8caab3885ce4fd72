//! Ordered layer routing.
//!
//! A [`Router`] owns a table of layers and scans it in registration order for
//! every request; there is no specificity ranking, the first layer that
//! terminates wins. For each layer whose pattern and verb accept the request:
//!
//! 1. its captures are merged into the request's params, overwriting names
//!    captured earlier
//! 2. its middleware run in order, the request ends as soon as the response
//!    carries a payload
//! 3. its endpoint runs. A non-router endpoint always ends the request, a
//!    nested router only when it left a payload
//!
//! A pending redirect is not a payload. When the scan runs out and the payload
//! is still absent the response becomes `404 Not found`.
//!
//! # Example
//!
//! ```
//! use nova_web::router::{Router, get};
//! use nova_web::handler_fn;
//!
//! let router = Router::builder()
//!     .route(
//!         "/users/:id",
//!         get(handler_fn(|req, res| {
//!             Box::pin(async move {
//!                 let id = req.param("id").unwrap_or_default().to_string();
//!                 res.json(&serde_json::json!({ "id": id }))?;
//!                 Ok(())
//!             })
//!         })),
//!     )
//!     .build()
//!     .unwrap();
//! # let _ = router;
//! ```

mod layer;
pub mod path;

use async_trait::async_trait;
use http::StatusCode;
use tracing::trace;

use crate::error::{HandlerError, RouteError};
use crate::handler::{Endpoint, Handler};
use crate::method::Method;
use crate::middleware::Middleware;
use crate::request::Request;
use crate::response::Response;
use layer::Layer;
use path::PathPattern;

/// An immutable, ordered table of layers.
#[derive(Debug)]
pub struct Router {
    layers: Vec<Layer>,
}

impl Router {
    pub fn builder() -> RouterBuilder {
        RouterBuilder::new()
    }

    /// A router without layers; it answers everything with 404.
    pub fn empty() -> Self {
        Self { layers: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Scans the layers without the final 404. Returns whether a layer ended
    /// the scan; an unmatched request is left absent.
    pub(crate) async fn dispatch(&self, req: &mut Request, res: &mut Response) -> Result<bool, HandlerError> {
        for layer in &self.layers {
            let Some(captures) = layer.matches(req.pathname(), req.method()) else {
                continue;
            };
            trace!(pattern = layer.pattern.as_str(), path = req.pathname(), "layer matched");

            req.merge_params(captures);

            for middleware in &layer.middleware {
                middleware.handle(req, res).await?;
                if !res.is_absent() {
                    trace!(pattern = layer.pattern.as_str(), "middleware short-circuited the request");
                    return Ok(true);
                }
            }

            let Some(endpoint) = &layer.endpoint else {
                continue;
            };

            endpoint.handle(req, res).await?;
            if !endpoint.is_router() || !res.is_absent() {
                return Ok(true);
            }
        }

        Ok(false)
    }
}

#[async_trait]
impl Handler for Router {
    async fn handle(&self, req: &mut Request, res: &mut Response) -> Result<(), HandlerError> {
        let terminated = self.dispatch(req, res).await?;

        if !terminated && res.is_absent() {
            res.status(StatusCode::NOT_FOUND).text("Not found");
        }
        Ok(())
    }
}

/// Collects layers in registration order, see [`Router::builder`].
#[derive(Default)]
pub struct RouterBuilder {
    entries: Vec<(String, Entry)>,
}

enum Entry {
    Route(MethodRoute),
    Middleware(Vec<Box<dyn Middleware>>),
}

impl RouterBuilder {
    fn new() -> Self {
        Self::default()
    }

    /// Appends a layer for `route` at `path`.
    pub fn route(mut self, path: impl Into<String>, route: MethodRoute) -> Self {
        self.entries.push((path.into(), Entry::Route(route)));
        self
    }

    /// Appends a layer running `middleware` for every verb on paths under `path`.
    pub fn middleware(mut self, path: impl Into<String>, middleware: impl Middleware + 'static) -> Self {
        self.entries.push((path.into(), Entry::Middleware(vec![Box::new(middleware)])));
        self
    }

    /// Appends a layer delegating every verb on paths under `path` to `router`.
    ///
    /// The nested router sees the full request path, so its own patterns
    /// include the mount prefix.
    pub fn mount(self, path: impl Into<String>, router: Router) -> Self {
        self.route(path, all(router))
    }

    /// Compiles every pattern. The first invalid one fails the build.
    pub fn build(self) -> Result<Router, RouteError> {
        let layers = self
            .entries
            .into_iter()
            .map(|(path, entry)| {
                let pattern = PathPattern::parse(&path)?;
                Ok(match entry {
                    Entry::Route(route) => Layer::new(route.method, pattern, route.middleware, Some(route.endpoint)),
                    Entry::Middleware(middleware) => Layer::new(None, pattern, middleware, None),
                })
            })
            .collect::<Result<Vec<_>, RouteError>>()?;

        Ok(Router { layers })
    }
}

impl std::fmt::Debug for RouterBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.entries.iter().map(|(path, _)| path)).finish()
    }
}

/// An endpoint with its verb filter and middleware, waiting to be added to a router.
pub struct MethodRoute {
    method: Option<Method>,
    middleware: Vec<Box<dyn Middleware>>,
    endpoint: Endpoint,
}

impl MethodRoute {
    /// Runs `middleware` before the endpoint, after those added earlier.
    pub fn with(mut self, middleware: impl Middleware + 'static) -> Self {
        self.middleware.push(Box::new(middleware));
        self
    }
}

impl std::fmt::Debug for MethodRoute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MethodRoute")
            .field("method", &self.method)
            .field("middleware", &self.middleware.len())
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

macro_rules! method_route {
    ($name:ident, $method:expr) => {
        pub fn $name(endpoint: impl Into<Endpoint>) -> MethodRoute {
            MethodRoute { method: $method, middleware: Vec::new(), endpoint: endpoint.into() }
        }
    };
}

method_route!(get, Some(Method::Get));
method_route!(post, Some(Method::Post));
method_route!(put, Some(Method::Put));
method_route!(patch, Some(Method::Patch));
method_route!(delete, Some(Method::Delete));
method_route!(all, None);
