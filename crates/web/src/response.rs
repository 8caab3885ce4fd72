//! The response accumulator handlers write into.
//!
//! A [`Response`] starts out with status 200, no headers and an *absent*
//! payload. Absent means no handler has produced output yet; the router relies
//! on it to decide between stopping and falling through. Headers keep the
//! case and order the caller used, setting a key again replaces its value.

use std::io;

use bytes::Bytes;
use futures::Stream;
use http::StatusCode;
use serde::Serialize;

use crate::body::ResponseBody;

pub const CONTENT_TYPE: &str = "Content-Type";
pub const LOCATION: &str = "Location";

pub(crate) const TEXT_PLAIN_UTF_8: &str = "text/plain; charset=utf-8";
const APPLICATION_JSON: &str = "application/json";
const APPLICATION_OCTET_STREAM: &str = "application/octet-stream";

#[derive(Debug, Default)]
pub struct Response {
    status: StatusCode,
    headers: Vec<(String, String)>,
    payload: Option<ResponseBody>,
}

impl Response {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&mut self, status: StatusCode) -> &mut Self {
        self.status = status;
        self
    }

    pub fn status_code(&self) -> StatusCode {
        self.status
    }

    /// Serializes `data` as the payload with `Content-Type: application/json`.
    pub fn json<T: Serialize + ?Sized>(&mut self, data: &T) -> Result<&mut Self, serde_json::Error> {
        let body = serde_json::to_vec(data)?;
        Ok(self.bytes(body, APPLICATION_JSON))
    }

    pub fn text(&mut self, data: impl Into<String>) -> &mut Self {
        self.bytes(data.into(), TEXT_PLAIN_UTF_8)
    }

    /// Sets an in-memory payload. An empty `content_type` means `application/octet-stream`.
    pub fn bytes(&mut self, data: impl Into<Bytes>, content_type: &str) -> &mut Self {
        self.set_content_type(content_type);
        self.payload = Some(ResponseBody::once(data.into()));
        self
    }

    /// Sets a streamed payload, sent without a `Content-Length`.
    pub fn stream<S>(&mut self, stream: S, content_type: &str) -> &mut Self
    where
        S: Stream<Item = Result<Bytes, io::Error>> + Send + 'static,
    {
        self.set_content_type(content_type);
        self.payload = Some(ResponseBody::stream(stream));
        self
    }

    /// Redirects with `302 Found`.
    pub fn redirect(&mut self, location: impl Into<String>) -> &mut Self {
        self.redirect_with(location, StatusCode::FOUND)
    }

    pub fn redirect_with(&mut self, location: impl Into<String>, status: StatusCode) -> &mut Self {
        self.status = status;
        self.set_header(LOCATION, location)
    }

    /// Sets a header, replacing an earlier value under the exact same key.
    ///
    /// `Location` is the exception: it replaces a `Location` set under any
    /// case, and discards any payload set so far.
    pub fn set_header(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        let key = key.into();
        let value = value.into();

        let is_location = key.eq_ignore_ascii_case(LOCATION);
        if is_location {
            self.payload = None;
        }

        let slot = self.headers.iter_mut().find(|(existing, _)| {
            *existing == key || (is_location && existing.eq_ignore_ascii_case(LOCATION))
        });
        match slot {
            Some(entry) => *entry = (key, value),
            None => self.headers.push((key, value)),
        }
        self
    }

    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers.iter().find(|(existing, _)| existing == key).map(|(_, value)| value.as_str())
    }

    pub fn headers(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers.iter().map(|(key, value)| (key.as_str(), value.as_str()))
    }

    /// The redirect target, whatever case its key was set with.
    pub fn location(&self) -> Option<&str> {
        self.headers
            .iter()
            .rev()
            .find(|(key, _)| key.eq_ignore_ascii_case(LOCATION))
            .map(|(_, value)| value.as_str())
    }

    /// True while no payload has been set.
    pub fn is_absent(&self) -> bool {
        self.payload.is_none()
    }

    /// True once a payload was set or a redirect is pending.
    pub fn has_output(&self) -> bool {
        !self.is_absent() || self.location().is_some()
    }

    pub fn payload(&self) -> Option<&ResponseBody> {
        self.payload.as_ref()
    }

    /// Converts into the transport's response. An absent payload becomes an empty body.
    pub fn into_http(self) -> Result<http::Response<ResponseBody>, http::Error> {
        let mut builder = http::Response::builder().status(self.status);
        for (key, value) in self.headers {
            builder = builder.header(key, value);
        }
        builder.body(self.payload.unwrap_or_default())
    }

    fn set_content_type(&mut self, content_type: &str) {
        let content_type = if content_type.is_empty() { APPLICATION_OCTET_STREAM } else { content_type };
        self.set_header(CONTENT_TYPE, content_type);
    }
}
