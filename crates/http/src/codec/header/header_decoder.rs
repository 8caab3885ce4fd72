//! Parses a request head with `httparse`.
//!
//! Limits: at most [`MAX_HEADER_NUM`] headers and [`MAX_HEADER_BYTES`] bytes of
//! head. Only HTTP/1.0 and HTTP/1.1 are accepted.

use bytes::{Buf, BytesMut};
use http::{HeaderName, HeaderValue, Method, Request, Uri, Version};
use httparse::Status;
use tokio_util::codec::Decoder;
use tracing::trace;

use crate::ensure;
use crate::protocol::{ParseError, PayloadSize, RequestHeader};

/// Maximum number of headers allowed in a request
pub const MAX_HEADER_NUM: usize = 64;

/// Maximum size in bytes allowed for the entire head
pub const MAX_HEADER_BYTES: usize = 8 * 1024;

/// Decodes a [`RequestHeader`] and works out how its payload is framed.
#[derive(Debug, Default)]
pub struct HeaderDecoder;

impl Decoder for HeaderDecoder {
    type Item = (RequestHeader, PayloadSize);
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.is_empty() {
            return Ok(None);
        }

        let mut headers = [httparse::EMPTY_HEADER; MAX_HEADER_NUM];
        let mut req = httparse::Request::new(&mut headers);

        let status = req.parse(&src[..]).map_err(|e| match e {
            httparse::Error::TooManyHeaders => ParseError::too_many_headers(MAX_HEADER_NUM),
            e => ParseError::invalid_header(e.to_string()),
        })?;

        let body_offset = match status {
            Status::Complete(body_offset) => body_offset,
            Status::Partial => {
                ensure!(src.len() <= MAX_HEADER_BYTES, ParseError::too_large_header(src.len(), MAX_HEADER_BYTES));
                return Ok(None);
            }
        };

        trace!(head_size = body_offset, "parsed request head");
        ensure!(body_offset <= MAX_HEADER_BYTES, ParseError::too_large_header(body_offset, MAX_HEADER_BYTES));

        let header = build_header(&req)?;
        let payload_size = header.payload_size()?;

        src.advance(body_offset);
        Ok(Some((header, payload_size)))
    }
}

fn build_header(req: &httparse::Request<'_, '_>) -> Result<RequestHeader, ParseError> {
    let version = match req.version {
        Some(0) => Version::HTTP_10,
        Some(1) => Version::HTTP_11,
        v => return Err(ParseError::InvalidVersion(v)),
    };

    let method = req.method.ok_or(ParseError::InvalidMethod)?;
    let method = Method::from_bytes(method.as_bytes()).map_err(|_| ParseError::InvalidMethod)?;
    let uri = req.path.ok_or(ParseError::InvalidUri)?.parse::<Uri>().map_err(|_| ParseError::InvalidUri)?;

    let mut builder = Request::builder().method(method).uri(uri).version(version);

    let headers = builder.headers_mut().ok_or_else(|| ParseError::invalid_header("request builder is broken"))?;
    headers.reserve(req.headers.len());
    for header in req.headers.iter() {
        let name = HeaderName::from_bytes(header.name.as_bytes()).map_err(ParseError::invalid_header)?;
        let value = HeaderValue::from_bytes(header.value).map_err(ParseError::invalid_header)?;
        headers.append(name, value);
    }

    builder.body(()).map(RequestHeader::from).map_err(ParseError::invalid_header)
}
