use crate::handler::Endpoint;
use crate::method::Method;
use crate::middleware::Middleware;
use crate::router::path::{MatchMode, PathPattern};

/// One entry of a router's ordered table.
///
/// `method` of `None` matches every verb. A layer without an endpoint only
/// runs its middleware; if none of them produced output the scan goes on.
pub(crate) struct Layer {
    pub(crate) method: Option<Method>,
    pub(crate) pattern: PathPattern,
    pub(crate) mode: MatchMode,
    pub(crate) middleware: Vec<Box<dyn Middleware>>,
    pub(crate) endpoint: Option<Endpoint>,
}

impl Layer {
    pub(crate) fn new(
        method: Option<Method>,
        pattern: PathPattern,
        middleware: Vec<Box<dyn Middleware>>,
        endpoint: Option<Endpoint>,
    ) -> Self {
        // routers and bare middleware resolve the rest of the path themselves
        let mode = match &endpoint {
            Some(endpoint) if !endpoint.is_router() => MatchMode::Exact,
            _ => MatchMode::Prefix,
        };
        Self { method, pattern, mode, middleware, endpoint }
    }

    /// The captures for `path` when both the pattern and the verb accept the request.
    pub(crate) fn matches(&self, path: &str, method: Method) -> Option<Vec<(String, String)>> {
        let captures = self.pattern.matches(path, self.mode)?;
        match self.method {
            Some(expected) if expected != method => None,
            _ => Some(captures),
        }
    }
}

impl std::fmt::Debug for Layer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Layer")
            .field("method", &self.method.map_or("ALL", |method| method.as_str()))
            .field("pattern", &self.pattern.as_str())
            .field("mode", &self.mode)
            .field("middleware", &self.middleware.len())
            .field("endpoint", &self.endpoint)
            .finish()
    }
}
