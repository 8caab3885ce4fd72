//! The HTTP/1.x transport underneath `nova-web`.
//!
//! This crate turns a byte stream into a [`http::Request`] whose body is a lazily
//! read [`protocol::body::ReqBody`], hands it to a [`handler::Handler`], and writes
//! the returned [`http::Response`] back out. It deliberately stays small:
//!
//! - one request per connection, every response carries `Connection: close`
//! - request bodies are framed by `Content-Length` only, `Transfer-Encoding`
//!   is rejected
//! - response bodies with an exact size get a `Content-Length`, others are
//!   delimited by closing the connection
//!
//! # Example
//!
//! ```no_run
//! use http::{Request, Response, StatusCode};
//! use http_body_util::BodyExt;
//! use std::error::Error;
//! use std::sync::Arc;
//! use tokio::net::TcpListener;
//! use tracing::{error, warn};
//! use nova_http::connection::HttpConnection;
//! use nova_http::handler::make_handler;
//! use nova_http::protocol::body::ReqBody;
//!
//! #[tokio::main]
//! async fn main() {
//!     let tcp_listener = TcpListener::bind("127.0.0.1:8080").await.unwrap();
//!     let handler = Arc::new(make_handler(echo));
//!
//!     loop {
//!         let (tcp_stream, _remote_addr) = match tcp_listener.accept().await {
//!             Ok(stream_and_addr) => stream_and_addr,
//!             Err(e) => {
//!                 warn!(cause = %e, "failed to accept");
//!                 continue;
//!             }
//!         };
//!
//!         let handler = handler.clone();
//!         tokio::spawn(async move {
//!             let (reader, writer) = tcp_stream.into_split();
//!             if let Err(e) = HttpConnection::new(reader, writer).process(handler).await {
//!                 error!(cause = %e, "connection failed");
//!             }
//!         });
//!     }
//! }
//!
//! async fn echo(request: Request<ReqBody>) -> Result<Response<String>, Box<dyn Error + Send + Sync>> {
//!     let body = request.into_body().collect().await?.to_bytes();
//!     Ok(Response::builder().status(StatusCode::OK).body(String::from_utf8_lossy(&body).into_owned())?)
//! }
//! ```
//!
//! # Modules
//!
//! - [`connection`]: drives a single request/response exchange
//! - [`protocol`]: request head, payload messages, body, errors
//! - [`codec`]: `tokio_util` decoders and encoders for the wire format
//! - [`handler`]: the seam an application implements

pub mod codec;
pub mod connection;
pub mod handler;
pub mod protocol;

mod utils;
pub(crate) use utils::ensure;
