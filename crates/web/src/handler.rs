use async_trait::async_trait;
use futures::future::BoxFuture;

use crate::error::HandlerError;
use crate::request::Request;
use crate::response::Response;
use crate::router::Router;
use crate::static_files::StaticFile;
use crate::verb::VerbHandler;

/// Anything the router can dispatch a request to.
///
/// A handler writes its output into `res`. Returning without setting a
/// payload is allowed; the server answers such a request with 404.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn handle(&self, req: &mut Request, res: &mut Response) -> Result<(), HandlerError>;
}

/// A [`Handler`] backed by a closure, see [`handler_fn`].
pub struct FnHandler<F> {
    f: F,
}

impl<F> std::fmt::Debug for FnHandler<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("FnHandler")
    }
}

/// Wraps a closure returning a boxed future as a [`Handler`].
///
/// ```
/// use nova_web::handler_fn;
///
/// let hello = handler_fn(|_req, res| {
///     Box::pin(async move {
///         res.text("hello");
///         Ok(())
///     })
/// });
/// # let _ = hello;
/// ```
pub fn handler_fn<F>(f: F) -> FnHandler<F>
where
    F: for<'a> Fn(&'a mut Request, &'a mut Response) -> BoxFuture<'a, Result<(), HandlerError>> + Send + Sync,
{
    FnHandler { f }
}

#[async_trait]
impl<F> Handler for FnHandler<F>
where
    F: for<'a> Fn(&'a mut Request, &'a mut Response) -> BoxFuture<'a, Result<(), HandlerError>> + Send + Sync,
{
    async fn handle(&self, req: &mut Request, res: &mut Response) -> Result<(), HandlerError> {
        (self.f)(req, res).await
    }
}

/// The terminal handler of a layer.
///
/// Whether the endpoint is a nested [`Router`] decides two things: the layer
/// matches its pattern as a prefix instead of the whole path, and dispatch only
/// stops after it if it produced output.
pub enum Endpoint {
    Leaf(Box<dyn Handler>),
    Verb(VerbHandler),
    Static(StaticFile),
    Router(Router),
}

impl Endpoint {
    pub fn leaf(handler: impl Handler + 'static) -> Self {
        Endpoint::Leaf(Box::new(handler))
    }

    pub fn is_router(&self) -> bool {
        matches!(self, Endpoint::Router(_))
    }
}

impl std::fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Endpoint::Leaf(_) => f.write_str("Leaf"),
            Endpoint::Verb(verb) => f.debug_tuple("Verb").field(verb).finish(),
            Endpoint::Static(file) => f.debug_tuple("Static").field(file).finish(),
            Endpoint::Router(router) => f.debug_tuple("Router").field(router).finish(),
        }
    }
}

#[async_trait]
impl Handler for Endpoint {
    async fn handle(&self, req: &mut Request, res: &mut Response) -> Result<(), HandlerError> {
        match self {
            Endpoint::Leaf(handler) => handler.handle(req, res).await,
            Endpoint::Verb(verb) => verb.handle(req, res).await,
            Endpoint::Static(file) => file.handle(req, res).await,
            // a nested router leaves an unmatched request absent so its parent can keep scanning
            Endpoint::Router(router) => {
                router.dispatch(req, res).await?;
                Ok(())
            }
        }
    }
}

impl<F> From<FnHandler<F>> for Endpoint
where
    FnHandler<F>: Handler + 'static,
{
    fn from(handler: FnHandler<F>) -> Self {
        Endpoint::leaf(handler)
    }
}

impl From<Box<dyn Handler>> for Endpoint {
    fn from(handler: Box<dyn Handler>) -> Self {
        Endpoint::Leaf(handler)
    }
}

impl From<VerbHandler> for Endpoint {
    fn from(verb: VerbHandler) -> Self {
        Endpoint::Verb(verb)
    }
}

impl From<StaticFile> for Endpoint {
    fn from(file: StaticFile) -> Self {
        Endpoint::Static(file)
    }
}

impl From<Router> for Endpoint {
    fn from(router: Router) -> Self {
        Endpoint::Router(router)
    }
}
