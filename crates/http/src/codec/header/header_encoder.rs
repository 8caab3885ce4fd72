//! Serializes a response head.
//!
//! The status line is always `HTTP/1.1`. Framing headers are owned by the
//! encoder: `Content-Length` is set from the payload size (or removed when the
//! body runs until close), `Transfer-Encoding` is dropped and
//! `Connection: close` is always sent.

use std::io;
use std::io::Write;

use bytes::{BufMut, BytesMut};
use http::{HeaderValue, header};
use tokio_util::codec::Encoder;

use crate::protocol::{PayloadSize, ResponseHead, SendError};

/// Initial buffer size allocated for header serialization
const INIT_HEADER_SIZE: usize = 4 * 1024;

#[derive(Debug, Default)]
pub struct HeaderEncoder;

impl Encoder<(ResponseHead, PayloadSize)> for HeaderEncoder {
    type Error = SendError;

    fn encode(&mut self, item: (ResponseHead, PayloadSize), dst: &mut BytesMut) -> Result<(), Self::Error> {
        let (mut head, payload_size) = item;

        dst.reserve(INIT_HEADER_SIZE);
        let status = head.status();
        write!(BufWriter(dst), "HTTP/1.1 {} {}\r\n", status.as_str(), status.canonical_reason().unwrap_or("Unknown"))?;

        let headers = head.headers_mut();
        match payload_size.exact() {
            Some(length) => {
                headers.insert(header::CONTENT_LENGTH, HeaderValue::from(length));
            }
            None => {
                headers.remove(header::CONTENT_LENGTH);
            }
        }
        headers.remove(header::TRANSFER_ENCODING);
        headers.insert(header::CONNECTION, HeaderValue::from_static("close"));

        for (name, value) in head.headers() {
            dst.put_slice(name.as_ref());
            dst.put_slice(b": ");
            dst.put_slice(value.as_bytes());
            dst.put_slice(b"\r\n");
        }
        dst.put_slice(b"\r\n");
        Ok(())
    }
}

/// `io::Write` over a `BytesMut`, so the status line can use `write!`.
struct BufWriter<'a>(&'a mut BytesMut);

impl Write for BufWriter<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.put_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
