//! One handler per verb behind a single endpoint.
//!
//! Unlike every other endpoint, [`VerbHandler`] contains its handlers'
//! failures: an error becomes `500 Internal Server Error` with a generic body
//! and never reaches the server. A verb without a handler gets `404 Not found`.

use async_trait::async_trait;
use http::StatusCode;
use tracing::error;

use crate::error::HandlerError;
use crate::handler::Handler;
use crate::method::Method;
use crate::request::Request;
use crate::response::{CONTENT_TYPE, Response, TEXT_PLAIN_UTF_8};

#[derive(Default)]
pub struct VerbHandler {
    get: Option<Box<dyn Handler>>,
    post: Option<Box<dyn Handler>>,
    put: Option<Box<dyn Handler>>,
    patch: Option<Box<dyn Handler>>,
    delete: Option<Box<dyn Handler>>,
}

macro_rules! verb_setter {
    ($name:ident) => {
        pub fn $name(mut self, handler: impl Handler + 'static) -> Self {
            self.$name = Some(Box::new(handler));
            self
        }
    };
}

impl VerbHandler {
    pub fn new() -> Self {
        Self::default()
    }

    verb_setter!(get);
    verb_setter!(post);
    verb_setter!(put);
    verb_setter!(patch);
    verb_setter!(delete);

    fn handler_for(&self, method: Method) -> Option<&dyn Handler> {
        let slot = match method {
            Method::Get => &self.get,
            Method::Post => &self.post,
            Method::Put => &self.put,
            Method::Patch => &self.patch,
            Method::Delete => &self.delete,
        };
        slot.as_deref()
    }

    /// The verbs that have a handler.
    pub fn methods(&self) -> impl Iterator<Item = Method> + '_ {
        Method::ALL.into_iter().filter(|method| self.handler_for(*method).is_some())
    }
}

impl std::fmt::Debug for VerbHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.methods()).finish()
    }
}

#[async_trait]
impl Handler for VerbHandler {
    async fn handle(&self, req: &mut Request, res: &mut Response) -> Result<(), HandlerError> {
        let method = req.method();
        let Some(handler) = self.handler_for(method) else {
            res.status(StatusCode::NOT_FOUND).set_header(CONTENT_TYPE, TEXT_PLAIN_UTF_8).text("Not found");
            return Ok(());
        };

        if let Err(e) = handler.handle(req, res).await {
            error!(%method, path = req.pathname(), cause = %e, "verb handler failed");
            res.status(StatusCode::INTERNAL_SERVER_ERROR)
                .set_header(CONTENT_TYPE, TEXT_PLAIN_UTF_8)
                .text("Internal Server Error");
        }
        Ok(())
    }
}
