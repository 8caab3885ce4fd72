//! The server frontend.
//!
//! For each connection the server builds a fresh [`Request`]/[`Response`]
//! pair, tries static delegation for paths carrying a file extension, hands
//! everything else to the [`Router`], and makes sure some response always goes
//! back: an empty one becomes 404, a failed one 500.

use std::any::Any;
use std::io;
use std::net::{SocketAddr, ToSocketAddrs};
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use http::StatusCode;
use nova_http::connection::HttpConnection;
use nova_http::handler::Handler as HttpHandler;
use nova_http::protocol::body::ReqBody;
use tokio::net::TcpListener;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

use crate::body::ResponseBody;
use crate::config::ServerConfig;
use crate::error::{BodyError, HandlerError, ServerBuildError};
use crate::handler::Handler;
use crate::method::Method;
use crate::request::Request;
use crate::response::Response;
use crate::router::Router;
use crate::static_files::{self, ContentProvider, StaticDir};

pub struct ServerBuilder {
    router: Option<Router>,
    address: Option<io::Result<Vec<SocketAddr>>>,
    config: ServerConfig,
    static_provider: Option<Arc<dyn ContentProvider>>,
}

impl ServerBuilder {
    fn new() -> Self {
        Self { router: None, address: None, config: ServerConfig::default(), static_provider: None }
    }

    pub fn address<A: ToSocketAddrs>(mut self, address: A) -> Self {
        self.address = Some(address.to_socket_addrs().map(Iterator::collect));
        self
    }

    pub fn router(mut self, router: Router) -> Self {
        self.router = Some(router);
        self
    }

    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn log_requests(mut self, log_requests: bool) -> Self {
        self.config.log_requests = log_requests;
        self
    }

    pub fn max_body_size(mut self, max_body_size: u64) -> Self {
        self.config.max_body_size = max_body_size;
        self
    }

    pub fn static_root(mut self, static_root: impl Into<PathBuf>) -> Self {
        self.config.static_root = static_root.into();
        self
    }

    pub fn static_memory_threshold(mut self, threshold: u64) -> Self {
        self.config.static_memory_threshold = threshold;
        self
    }

    /// Replaces the [`StaticDir`] built from the config.
    pub fn static_provider(mut self, provider: Arc<dyn ContentProvider>) -> Self {
        self.static_provider = Some(provider);
        self
    }

    pub fn build(self) -> Result<Server, ServerBuildError> {
        let router = self.router.ok_or(ServerBuildError::MissingRouter)?;
        let address = self.address.ok_or(ServerBuildError::MissingAddress)??;
        if address.is_empty() {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "address resolved to nothing").into());
        }

        let config = self.config;
        let static_provider = self.static_provider.unwrap_or_else(|| {
            Arc::new(StaticDir::new(config.static_root.clone()).with_memory_threshold(config.static_memory_threshold))
        });

        Ok(Server { router, address, config, static_provider })
    }
}

impl std::fmt::Debug for ServerBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerBuilder").field("router", &self.router).field("config", &self.config).finish()
    }
}

pub struct Server {
    router: Router,
    address: Vec<SocketAddr>,
    config: ServerConfig,
    static_provider: Arc<dyn ContentProvider>,
}

impl Server {
    pub fn builder() -> ServerBuilder {
        ServerBuilder::new()
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn address(&self) -> &[SocketAddr] {
        &self.address
    }

    /// Binds the configured address and serves until the process ends.
    pub async fn start(self) -> io::Result<()> {
        let subscriber = FmtSubscriber::builder().with_max_level(Level::INFO).finish();
        if tracing::subscriber::set_global_default(subscriber).is_err() {
            debug!("a global subscriber is already installed");
        }

        info!("start listening at {:?}", self.address);
        let tcp_listener = match TcpListener::bind(self.address.as_slice()).await {
            Ok(tcp_listener) => tcp_listener,
            Err(e) => {
                error!(cause = %e, "bind server error");
                return Err(e);
            }
        };

        self.serve(tcp_listener).await
    }

    /// Accepts connections on `tcp_listener`, one task per connection.
    pub async fn serve(self, tcp_listener: TcpListener) -> io::Result<()> {
        let handler = Arc::new(self);
        loop {
            let (tcp_stream, _remote_addr) = match tcp_listener.accept().await {
                Ok(stream_and_addr) => stream_and_addr,
                Err(e) => {
                    warn!(cause = %e, "failed to accept");
                    continue;
                }
            };

            let handler = Arc::clone(&handler);

            tokio::spawn(async move {
                let (reader, writer) = tcp_stream.into_split();
                let connection = HttpConnection::new(reader, writer);
                match connection.process(handler).await {
                    Ok(()) => {
                        debug!("finished process, connection shutdown");
                    }
                    Err(e) => {
                        error!("service has error, cause {}, connection shutdown", e);
                    }
                }
            });
        }
    }

    /// Runs one request through static delegation and the router.
    ///
    /// Never fails: errors and panics become a 500, a body error its own
    /// client status, and a response nobody wrote a 404.
    pub async fn respond(&self, req: &mut Request) -> Response {
        if self.config.log_requests {
            info!(method = %req.method(), path = req.pathname(), "request");
        }

        let mut res = Response::new();
        let outcome = AssertUnwindSafe(self.dispatch(req, &mut res)).catch_unwind().await;

        match outcome {
            Ok(Ok(())) => {
                if !res.has_output() {
                    res.status(StatusCode::NOT_FOUND).text("Not found");
                }
            }
            Ok(Err(e)) => {
                res = failure_response(e.as_ref());
            }
            Err(panic) => {
                error!(method = %req.method(), path = req.pathname(), cause = panic_message(panic.as_ref()), "handler panicked");
                res = status_response(StatusCode::INTERNAL_SERVER_ERROR);
            }
        }

        if self.config.log_requests {
            info!(status = res.status_code().as_u16(), location = res.location(), "response");
        }
        res
    }

    async fn dispatch(&self, req: &mut Request, res: &mut Response) -> Result<(), HandlerError> {
        if has_extension(req.pathname()) && static_files::serve(self.static_provider.as_ref(), req.pathname(), res).await
        {
            debug!(path = req.pathname(), "served static file");
            return Ok(());
        }

        self.router.handle(req, res).await
    }
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("router", &self.router)
            .field("address", &self.address)
            .field("config", &self.config)
            .finish()
    }
}

#[async_trait]
impl HttpHandler for Server {
    type RespBody = ResponseBody;
    type Error = HandlerError;

    async fn call(&self, req: http::Request<ReqBody>) -> Result<http::Response<Self::RespBody>, Self::Error> {
        let (parts, body) = req.into_parts();

        let res = match Method::try_from(&parts.method) {
            Ok(method) => {
                let mut request =
                    Request::from_parts(method, parts.uri, parts.headers, body, self.config.max_body_size);
                self.respond(&mut request).await
            }
            Err(unsupported) => {
                if self.config.log_requests {
                    info!(method = %unsupported.0, path = parts.uri.path(), "request with unsupported method");
                }
                status_response(StatusCode::NOT_FOUND)
            }
        };

        match res.into_http() {
            Ok(response) => Ok(response),
            Err(e) => {
                error!(cause = %e, "response can not be converted");
                Ok(status_response(StatusCode::INTERNAL_SERVER_ERROR).into_http()?)
            }
        }
    }
}

fn has_extension(path: &str) -> bool {
    Path::new(path).extension().is_some_and(|extension| !extension.is_empty())
}

fn failure_response(e: &(dyn std::error::Error + Send + Sync + 'static)) -> Response {
    match e.downcast_ref::<BodyError>() {
        Some(body_error) => {
            warn!(cause = %body_error, "rejecting request body");
            status_response(body_error.status_code())
        }
        None => {
            error!(cause = %e, "request failed");
            status_response(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

fn status_response(status: StatusCode) -> Response {
    let mut res = Response::new();
    let message = match status {
        StatusCode::NOT_FOUND => "Not found",
        _ => status.canonical_reason().unwrap_or("Error"),
    };
    res.status(status).text(message);
    res
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::handler_fn;
    use crate::middleware::middleware_fn;
    use crate::router::{get, post};
    use crate::static_files::{ContentPayload, MockContentProvider, StaticContent};
    use bytes::Bytes;
    use http_body_util::BodyExt;

    fn router() -> Router {
        Router::builder()
            .route(
                "/hello",
                get(handler_fn(|_req, res| {
                    Box::pin(async move {
                        res.text("hello");
                        Ok(())
                    })
                })),
            )
            .route("/silent", get(handler_fn(|_req, _res| Box::pin(async move { Ok(()) }))))
            .route(
                "/upload",
                post(handler_fn(|req, res| {
                    Box::pin(async move {
                        let body = req.read_body().await?;
                        res.text(format!("{} bytes", body.len()));
                        Ok(())
                    })
                })),
            )
            .route("/fail", get(handler_fn(|_req, _res| Box::pin(async move { Err("broken".into()) }))))
            .route(
                "/guarded",
                get(handler_fn(|_req, res| {
                    Box::pin(async move {
                        res.text("secret");
                        Ok(())
                    })
                }))
                .with(middleware_fn(|_req, _res| Box::pin(async move { Err("session store unreachable".into()) }))),
            )
            .route(
                "/users",
                post(handler_fn(|req, res| {
                    Box::pin(async move {
                        let user: serde_json::Value = req.json().await?;
                        res.json(&user)?;
                        Ok(())
                    })
                })),
            )
            .route(
                "/panic",
                get(handler_fn(|req, res| {
                    Box::pin(async move {
                        res.text(req.param("id").expect("route has no id").to_string());
                        Ok(())
                    })
                })),
            )
            .route(
                "/away",
                get(handler_fn(|_req, res| {
                    Box::pin(async move {
                        res.redirect("/login");
                        Ok(())
                    })
                })),
            )
            .build()
            .unwrap()
    }

    fn server(provider: MockContentProvider) -> Server {
        Server::builder()
            .address("127.0.0.1:0")
            .router(router())
            .max_body_size(8)
            .static_provider(Arc::new(provider))
            .build()
            .unwrap()
    }

    fn no_static_files() -> MockContentProvider {
        let mut provider = MockContentProvider::new();
        provider.expect_fetch().returning(|_| Ok(None));
        provider
    }

    async fn respond(server: &Server, method: Method, uri: &str) -> Response {
        let mut req = Request::new(method, uri.parse().unwrap()).with_max_body_size(server.config().max_body_size);
        server.respond(&mut req).await
    }

    #[test]
    fn build_needs_router_and_address() {
        assert!(matches!(Server::builder().address("127.0.0.1:0").build(), Err(ServerBuildError::MissingRouter)));
        assert!(matches!(Server::builder().router(Router::empty()).build(), Err(ServerBuildError::MissingAddress)));
        assert!(matches!(
            Server::builder().router(Router::empty()).address("not an address").build(),
            Err(ServerBuildError::InvalidAddress { .. })
        ));
    }

    #[tokio::test]
    async fn routes_requests() {
        let server = server(no_static_files());
        let res = respond(&server, Method::Get, "/hello").await;
        assert_eq!(res.status_code(), StatusCode::OK);
    }

    #[tokio::test]
    async fn empty_output_becomes_404() {
        let server = server(no_static_files());
        let res = respond(&server, Method::Get, "/silent").await;
        assert_eq!(res.status_code(), StatusCode::NOT_FOUND);
        assert!(!res.is_absent());
    }

    #[tokio::test]
    async fn redirect_is_not_turned_into_404() {
        let server = server(no_static_files());
        let res = respond(&server, Method::Get, "/away").await;

        assert_eq!(res.status_code(), StatusCode::FOUND);
        assert_eq!(res.location(), Some("/login"));
        assert!(res.is_absent());
    }

    #[tokio::test]
    async fn errors_and_panics_become_500() {
        let server = server(no_static_files());

        let res = respond(&server, Method::Get, "/fail").await;
        assert_eq!(res.status_code(), StatusCode::INTERNAL_SERVER_ERROR);

        let res = respond(&server, Method::Get, "/panic").await;
        assert_eq!(res.status_code(), StatusCode::INTERNAL_SERVER_ERROR);

        let res = respond(&server, Method::Get, "/hello").await;
        assert_eq!(res.status_code(), StatusCode::OK);
    }

    #[tokio::test]
    async fn middleware_errors_become_500() {
        let server = server(no_static_files());
        let res = respond(&server, Method::Get, "/guarded").await;

        assert_eq!(res.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = res.into_http().unwrap().into_body().collect().await.unwrap().to_bytes();
        assert_eq!(body, Bytes::from_static(b"Internal Server Error"));
    }

    #[tokio::test]
    async fn malformed_json_is_400() {
        let server = server(no_static_files());
        let mut req = Request::new(Method::Post, "/users".parse().unwrap()).with_body("{x").with_max_body_size(8);
        let res = server.respond(&mut req).await;
        assert_eq!(res.status_code(), StatusCode::BAD_REQUEST);

        let mut valid = Request::new(Method::Post, "/users".parse().unwrap()).with_body("{}").with_max_body_size(8);
        assert_eq!(server.respond(&mut valid).await.status_code(), StatusCode::OK);
    }

    #[tokio::test]
    async fn oversized_body_is_413() {
        let server = server(no_static_files());
        let mut large =
            Request::new(Method::Post, "/upload".parse().unwrap()).with_body("way past eight bytes").with_max_body_size(8);
        let res = server.respond(&mut large).await;
        assert_eq!(res.status_code(), StatusCode::PAYLOAD_TOO_LARGE);

        let mut small = Request::new(Method::Post, "/upload".parse().unwrap()).with_body("tiny").with_max_body_size(8);
        assert_eq!(server.respond(&mut small).await.status_code(), StatusCode::OK);
    }

    #[tokio::test]
    async fn paths_with_an_extension_try_static_files_first() {
        let mut provider = MockContentProvider::new();
        provider.expect_fetch().withf(|path| path == "/hello.css").times(1).returning(|_| {
            Ok(Some(StaticContent {
                content_type: "text/css; charset=utf-8".to_string(),
                payload: ContentPayload::Buffered(Bytes::from_static(b"body{}")),
            }))
        });
        let server = server(provider);

        let res = respond(&server, Method::Get, "/hello.css").await;
        assert_eq!(res.header("Content-Type"), Some("text/css; charset=utf-8"));

        // no extension, so the provider is never asked
        let res = respond(&server, Method::Get, "/hello").await;
        assert_eq!(res.header("Content-Type"), Some("text/plain; charset=utf-8"));
    }

    #[tokio::test]
    async fn missing_static_file_falls_back_to_routing() {
        let mut provider = MockContentProvider::new();
        provider.expect_fetch().times(1).returning(|_| Ok(None));
        let server = server(provider);

        let res = respond(&server, Method::Get, "/missing.png").await;
        assert_eq!(res.status_code(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn unsupported_methods_are_404() {
        let server = server(no_static_files());
        let request = http::Request::builder().method(http::Method::OPTIONS).uri("/hello").body(ReqBody::empty()).unwrap();

        let response = server.call(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn call_converts_for_the_transport() {
        let server = server(no_static_files());
        let request = http::Request::builder().uri("/hello").body(ReqBody::empty()).unwrap();

        let response = server.call(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.into_body().collect().await.unwrap().to_bytes(), Bytes::from_static(b"hello"));
    }
}
