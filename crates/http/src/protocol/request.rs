//! The parsed head of an incoming request.

use http::request::Parts;
use http::{HeaderMap, Method, Request, Uri, Version};

use crate::protocol::{ParseError, PayloadSize};

/// The head of an HTTP request: method, target, version and headers.
///
/// Wraps an `http::Request<()>` so the body can be attached once the decoder
/// knows how the payload is framed.
#[derive(Debug)]
pub struct RequestHeader {
    inner: Request<()>,
}

impl AsRef<Request<()>> for RequestHeader {
    fn as_ref(&self) -> &Request<()> {
        &self.inner
    }
}

impl RequestHeader {
    pub fn into_inner(self) -> Request<()> {
        self.inner
    }

    /// Attaches a body, producing the full request.
    pub fn body<T>(self, body: T) -> Request<T> {
        self.inner.map(|_| body)
    }

    pub fn method(&self) -> &Method {
        self.inner.method()
    }

    pub fn uri(&self) -> &Uri {
        self.inner.uri()
    }

    pub fn version(&self) -> Version {
        self.inner.version()
    }

    pub fn headers(&self) -> &HeaderMap {
        self.inner.headers()
    }

    /// Whether the client asked for an interim `100 Continue` before sending the body.
    pub fn expects_continue(&self) -> bool {
        self.headers()
            .get(http::header::EXPECT)
            .map(|value| value.as_bytes().eq_ignore_ascii_case(b"100-continue"))
            .unwrap_or(false)
    }

    /// Works out how the request body is framed.
    ///
    /// Only `Content-Length` framing is understood. Any `Transfer-Encoding` is
    /// refused, and repeated `Content-Length` headers must agree.
    pub fn payload_size(&self) -> Result<PayloadSize, ParseError> {
        if self.headers().contains_key(http::header::TRANSFER_ENCODING) {
            return Err(ParseError::UnsupportedTransferEncoding);
        }

        let mut length: Option<u64> = None;
        for value in self.headers().get_all(http::header::CONTENT_LENGTH) {
            let value_str = value.to_str().map_err(|_| ParseError::invalid_content_length("value can't to_str"))?;
            let parsed = value_str
                .trim()
                .parse::<u64>()
                .map_err(|_| ParseError::invalid_content_length(format!("value {value_str} is not u64")))?;

            match length {
                Some(previous) if previous != parsed => {
                    return Err(ParseError::invalid_content_length("conflicting content-length values"));
                }
                _ => length = Some(parsed),
            }
        }

        Ok(length.map(PayloadSize::from_length).unwrap_or(PayloadSize::Empty))
    }
}

impl From<Parts> for RequestHeader {
    #[inline]
    fn from(parts: Parts) -> Self {
        Self { inner: Request::from_parts(parts, ()) }
    }
}

impl From<Request<()>> for RequestHeader {
    #[inline]
    fn from(inner: Request<()>) -> Self {
        Self { inner }
    }
}
