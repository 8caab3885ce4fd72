//! Drives one request/response exchange over a byte stream.
//!
//! [`HttpConnection`] decodes the request head, hands the request with its lazy
//! body to a [`crate::handler::Handler`], writes the response and closes the
//! write side. Keep-alive is not supported: every response is sent with
//! `Connection: close`.

mod http_connection;

pub use http_connection::HttpConnection;
