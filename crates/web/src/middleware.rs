//! Middleware run before a layer's handler.
//!
//! Middleware of a layer run one after another. After each one the router
//! looks at the response: once it carries output the request is finished and
//! neither the remaining middleware nor the handler run. That is how a
//! middleware rejects a request, usually through [`reject`].

use async_trait::async_trait;
use futures::future::BoxFuture;
use http::StatusCode;

use crate::error::HandlerError;
use crate::request::Request;
use crate::response::{CONTENT_TYPE, Response, TEXT_PLAIN_UTF_8};

#[async_trait]
pub trait Middleware: Send + Sync {
    async fn handle(&self, req: &mut Request, res: &mut Response) -> Result<(), HandlerError>;
}

pub struct FnMiddleware<F> {
    f: F,
}

impl<F> std::fmt::Debug for FnMiddleware<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("FnMiddleware")
    }
}

pub fn middleware_fn<F>(f: F) -> FnMiddleware<F>
where
    F: for<'a> Fn(&'a mut Request, &'a mut Response) -> BoxFuture<'a, Result<(), HandlerError>> + Send + Sync,
{
    FnMiddleware { f }
}

#[async_trait]
impl<F> Middleware for FnMiddleware<F>
where
    F: for<'a> Fn(&'a mut Request, &'a mut Response) -> BoxFuture<'a, Result<(), HandlerError>> + Send + Sync,
{
    async fn handle(&self, req: &mut Request, res: &mut Response) -> Result<(), HandlerError> {
        (self.f)(req, res).await
    }
}

/// Short-circuits the request with a plain-text message.
pub fn reject(res: &mut Response, status: StatusCode, message: &str) {
    res.status(status).set_header(CONTENT_TYPE, TEXT_PLAIN_UTF_8).text(message);
}

/// [`reject`] with `400 Bad Request`.
pub fn bad_request(res: &mut Response) {
    reject(res, StatusCode::BAD_REQUEST, "Bad Request");
}
