//! The request as handlers see it.
//!
//! A [`Request`] is built once per connection and is owned by the task serving
//! it. Besides the head it carries two pieces of mutable state: the path
//! parameters accumulated while routing, and the body, which is read from the
//! transport at most once and cached afterwards.

use std::collections::HashMap;
use std::error::Error;

use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue, Uri};
use http_body_util::{BodyExt, LengthLimitError, Limited};
use nova_http::protocol::body::ReqBody;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::config::DEFAULT_MAX_BODY_SIZE;
use crate::error::BodyError;
use crate::method::Method;

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

#[derive(Debug)]
pub struct Request {
    method: Method,
    uri: Uri,
    pathname: String,
    headers: HeaderMap,
    params: HashMap<String, String>,
    max_body_size: u64,
    body: BodyState,
}

#[derive(Debug)]
enum BodyState {
    Unread(ReqBody),
    Read(Bytes),
    TooLarge(u64),
    Broken(String),
}

impl Request {
    /// A request with no headers and an empty body.
    pub fn new(method: Method, uri: Uri) -> Self {
        Self::from_parts(method, uri, HeaderMap::new(), ReqBody::empty(), DEFAULT_MAX_BODY_SIZE)
    }

    pub fn from_parts(method: Method, uri: Uri, headers: HeaderMap, body: ReqBody, max_body_size: u64) -> Self {
        let pathname = match uri.path() {
            "" => "/".to_string(),
            path => path.to_string(),
        };

        Self {
            method,
            uri,
            pathname,
            headers,
            params: HashMap::new(),
            max_body_size,
            body: BodyState::Unread(body),
        }
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = BodyState::Unread(ReqBody::full(body));
        self
    }

    pub fn with_max_body_size(mut self, max_body_size: u64) -> Self {
        self.max_body_size = max_body_size;
        self
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// The path routing matches against.
    pub fn pathname(&self) -> &str {
        &self.pathname
    }

    /// Rewrites the path seen by routing. The original stays in [`Request::uri`].
    pub fn set_pathname(&mut self, pathname: impl Into<String>) {
        self.pathname = pathname.into();
    }

    /// The raw query string, without the leading `?`.
    pub fn query(&self) -> Option<&str> {
        self.uri.query()
    }

    /// The first value of a query parameter, percent-decoded.
    pub fn query_param(&self, name: &str) -> Option<String> {
        let pairs: Vec<(String, String)> = serde_urlencoded::from_str(self.query()?).ok()?;
        pairs.into_iter().find(|(key, _)| key == name).map(|(_, value)| value)
    }

    /// Deserializes the whole query string, nested keys included.
    pub fn query_as<T: DeserializeOwned>(&self) -> Result<T, serde_qs::Error> {
        serde_qs::from_str(self.query().unwrap_or_default())
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// The first value of a header, if it is visible ASCII.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    /// Every value of a repeated header in arrival order.
    pub fn header_all<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a str> + 'a {
        self.headers.get_all(name).into_iter().filter_map(|value| value.to_str().ok())
    }

    pub fn params(&self) -> &HashMap<String, String> {
        &self.params
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// Adds captured path parameters; a name captured again takes the new value.
    pub(crate) fn merge_params(&mut self, captures: impl IntoIterator<Item = (String, String)>) {
        self.params.extend(captures);
    }

    pub fn max_body_size(&self) -> u64 {
        self.max_body_size
    }

    /// Reads the whole body.
    ///
    /// The transport is touched only by the first call; later calls return
    /// the cached bytes, or the same error if the first read failed. A body
    /// larger than the configured limit fails with [`BodyError::TooLarge`]
    /// and none of it is kept.
    pub async fn read_body(&mut self) -> Result<Bytes, BodyError> {
        if let BodyState::Unread(body) = &mut self.body {
            let body = std::mem::take(body);
            self.body = read_limited(body, self.max_body_size).await;
        }

        match &self.body {
            BodyState::Read(bytes) => Ok(bytes.clone()),
            BodyState::TooLarge(limit) => Err(BodyError::TooLarge { limit: *limit }),
            BodyState::Broken(reason) => Err(BodyError::read(reason)),
            BodyState::Unread(_) => Ok(Bytes::new()),
        }
    }

    pub async fn text(&mut self) -> Result<String, BodyError> {
        let bytes = self.read_body().await?;
        String::from_utf8(bytes.into()).map_err(|_utf8_error| BodyError::InvalidUtf8)
    }

    /// Parses the body as JSON. An empty body is read as `{}`.
    pub async fn json<T: DeserializeOwned>(&mut self) -> Result<T, BodyError> {
        let bytes = self.read_body().await?;
        let source: &[u8] = if bytes.is_empty() { b"{}" } else { &bytes };
        Ok(serde_json::from_slice(source)?)
    }

    /// Parses an `application/x-www-form-urlencoded` body.
    pub async fn form<T: DeserializeOwned>(&mut self) -> Result<T, BodyError> {
        let is_form = self
            .header(http::header::CONTENT_TYPE.as_str())
            .and_then(|value| value.parse::<mime::Mime>().ok())
            .is_some_and(|content_type| content_type.essence_str() == FORM_CONTENT_TYPE);

        if !is_form {
            return Err(BodyError::UnsupportedMediaType { expected: FORM_CONTENT_TYPE });
        }

        let bytes = self.read_body().await?;
        Ok(serde_urlencoded::from_bytes(&bytes)?)
    }
}

async fn read_limited(body: ReqBody, limit: u64) -> BodyState {
    if body.content_length() > limit {
        debug!(declared = body.content_length(), limit, "declared body length exceeds the limit");
        return BodyState::TooLarge(limit);
    }

    let max = usize::try_from(limit).unwrap_or(usize::MAX);
    match Limited::new(body, max).collect().await {
        Ok(collected) => BodyState::Read(collected.to_bytes()),
        Err(e) if is_length_limit(e.as_ref()) => BodyState::TooLarge(limit),
        Err(e) => BodyState::Broken(e.to_string()),
    }
}

fn is_length_limit(e: &(dyn Error + Send + Sync + 'static)) -> bool {
    e.downcast_ref::<LengthLimitError>().is_some()
}
