//! A small HTTP dispatch layer on top of `nova-http`.
//!
//! A [`Router`] is an ordered list of layers. Each layer pairs a path pattern
//! and an optional verb with a middleware chain and an [`Endpoint`]: a closure
//! handler, a [`VerbHandler`], a [`StaticFile`] or another router. The first
//! matching layer that produces output ends dispatch; a nested router that
//! leaves the response empty lets the scan continue.
//!
//! [`Server`] sits in front of the router. It serves files for paths with an
//! extension, answers `404 Not found` when nothing wrote a response and turns
//! handler failures into `500 Internal Server Error`.
//!
//! # Example
//!
//! ```no_run
//! use nova_web::router::{Router, get, post};
//! use nova_web::{Server, handler_fn};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     let api = Router::builder()
//!         .route(
//!             "/api/users/:id",
//!             get(handler_fn(|req, res| {
//!                 Box::pin(async move {
//!                     let id = req.param("id").unwrap_or_default().to_string();
//!                     res.json(&serde_json::json!({ "id": id }))?;
//!                     Ok(())
//!                 })
//!             })),
//!         )
//!         .build()?;
//!
//!     let router = Router::builder()
//!         .mount("/api", api)
//!         .route(
//!             "/echo",
//!             post(handler_fn(|req, res| {
//!                 Box::pin(async move {
//!                     let body = req.text().await?;
//!                     res.text(body);
//!                     Ok(())
//!                 })
//!             })),
//!         )
//!         .build()?;
//!
//!     Server::builder().address("127.0.0.1:8080").router(router).build()?.start().await?;
//!     Ok(())
//! }
//! ```

mod body;
mod error;
mod handler;
mod method;
mod request;
mod response;
mod server;

pub mod config;
pub mod middleware;
pub mod router;
pub mod static_files;
pub mod verb;

pub use body::ResponseBody;
pub use config::ServerConfig;
pub use error::{BodyError, HandlerError, RouteError, ServerBuildError};
pub use handler::{Endpoint, FnHandler, Handler, handler_fn};
pub use method::{Method, UnsupportedMethod};
pub use middleware::{Middleware, middleware_fn};
pub use request::Request;
pub use response::{CONTENT_TYPE, LOCATION, Response};
pub use router::Router;
pub use server::{Server, ServerBuilder};
pub use static_files::{StaticDir, StaticFile};
pub use verb::VerbHandler;
