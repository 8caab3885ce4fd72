//! `tokio_util` codecs for the wire format.
//!
//! - [`RequestDecoder`]: request head, then the `Content-Length` framed payload
//! - [`ResponseEncoder`]: response head, then the payload, either length framed
//!   or written raw until the connection closes
//!
//! ```no_run
//! use nova_http::codec::RequestDecoder;
//! use tokio_util::codec::Decoder;
//! use bytes::BytesMut;
//!
//! let mut decoder = RequestDecoder::new();
//! let mut buffer = BytesMut::from(&b"GET / HTTP/1.1\r\nHost: localhost\r\n\r\n"[..]);
//! let message = decoder.decode(&mut buffer);
//! ```

mod header;
mod request_decoder;
mod response_encoder;

pub use request_decoder::RequestDecoder;
pub use response_encoder::ResponseEncoder;
