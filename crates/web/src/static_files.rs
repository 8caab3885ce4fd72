//! Static file serving.
//!
//! Files are reached through a [`ContentProvider`], keyed by request path.
//! [`StaticDir`] is the provider over a directory on disk: files up to its
//! memory threshold are read into memory, larger ones are streamed.

use std::fmt;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use futures::stream::BoxStream;
use http::StatusCode;
use tokio_util::io::ReaderStream;
use tracing::{debug, warn};

use crate::config::{DEFAULT_STATIC_MEMORY_THRESHOLD, DEFAULT_STATIC_ROOT};
use crate::error::HandlerError;
use crate::handler::Handler;
use crate::request::Request;
use crate::response::Response;

/// A file found by a [`ContentProvider`].
#[derive(Debug)]
pub struct StaticContent {
    pub content_type: String,
    pub payload: ContentPayload,
}

pub enum ContentPayload {
    Buffered(Bytes),
    Streamed(BoxStream<'static, io::Result<Bytes>>),
}

impl fmt::Debug for ContentPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentPayload::Buffered(bytes) => write!(f, "Buffered({} bytes)", bytes.len()),
            ContentPayload::Streamed(_) => f.write_str("Streamed"),
        }
    }
}

/// Looks up static content by request path.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ContentProvider: Send + Sync {
    /// `Ok(None)` when nothing servable lives at `path`.
    async fn fetch(&self, path: &str) -> io::Result<Option<StaticContent>>;
}

/// Writes the content at `path` into `res`. Returns whether anything was found.
///
/// Provider errors are logged and treated as not found.
pub async fn serve(provider: &dyn ContentProvider, path: &str, res: &mut Response) -> bool {
    let content = match provider.fetch(path).await {
        Ok(Some(content)) => content,
        Ok(None) => return false,
        Err(e) => {
            warn!(path, cause = %e, "static content lookup failed");
            return false;
        }
    };

    match content.payload {
        ContentPayload::Buffered(bytes) => res.bytes(bytes, &content.content_type),
        ContentPayload::Streamed(stream) => res.stream(stream, &content.content_type),
    };
    true
}

/// Serves files below a root directory.
#[derive(Debug, Clone)]
pub struct StaticDir {
    root: PathBuf,
    memory_threshold: u64,
}

impl StaticDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into(), memory_threshold: DEFAULT_STATIC_MEMORY_THRESHOLD }
    }

    /// Files larger than `threshold` bytes are streamed instead of buffered.
    pub fn with_memory_threshold(mut self, threshold: u64) -> Self {
        self.memory_threshold = threshold;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Maps a request path below the root. Paths climbing out with `..` map to nothing.
    pub fn resolve(&self, path: &str) -> Option<PathBuf> {
        let mut resolved = self.root.clone();
        for component in Path::new(path.trim_start_matches('/')).components() {
            match component {
                Component::Normal(part) => resolved.push(part),
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
            }
        }
        Some(resolved)
    }
}

impl Default for StaticDir {
    fn default() -> Self {
        Self::new(DEFAULT_STATIC_ROOT)
    }
}

#[async_trait]
impl ContentProvider for StaticDir {
    async fn fetch(&self, path: &str) -> io::Result<Option<StaticContent>> {
        let Some(file_path) = self.resolve(path) else {
            debug!(path, "refusing path outside of the static root");
            return Ok(None);
        };

        let metadata = match tokio::fs::metadata(&file_path).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e),
        };
        if !metadata.is_file() {
            return Ok(None);
        }

        let content_type = mime_for(&file_path);
        let payload = if metadata.len() > self.memory_threshold {
            let file = tokio::fs::File::open(&file_path).await?;
            ContentPayload::Streamed(ReaderStream::new(file).boxed())
        } else {
            ContentPayload::Buffered(Bytes::from(tokio::fs::read(&file_path).await?))
        };

        Ok(Some(StaticContent { content_type, payload }))
    }
}

/// The content type for a file, by extension. Text and JSON carry `charset=utf-8`.
pub fn mime_for(path: &Path) -> String {
    let guess = mime_guess::from_path(path).first_or_octet_stream();
    if guess.type_() == mime::TEXT || guess.subtype() == mime::JSON {
        format!("{guess}; charset=utf-8")
    } else {
        guess.to_string()
    }
}

/// An endpoint serving one fixed file, whatever the request path.
#[derive(Clone)]
pub struct StaticFile {
    path: String,
    provider: Arc<dyn ContentProvider>,
}

impl StaticFile {
    /// Serves `path` from the default `public` directory.
    pub fn new(path: impl Into<String>) -> Self {
        Self::with_provider(path, Arc::new(StaticDir::default()))
    }

    pub fn with_provider(path: impl Into<String>, provider: Arc<dyn ContentProvider>) -> Self {
        Self { path: path.into(), provider }
    }
}

impl fmt::Debug for StaticFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticFile").field("path", &self.path).finish()
    }
}

#[async_trait]
impl Handler for StaticFile {
    async fn handle(&self, _req: &mut Request, res: &mut Response) -> Result<(), HandlerError> {
        if !serve(self.provider.as_ref(), &self.path, res).await {
            res.status(StatusCode::NOT_FOUND).text("File not found");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::method::Method;
    use http_body_util::BodyExt;
    use mockall::predicate::eq;

    fn temp_root(name: &str) -> PathBuf {
        let root = std::env::temp_dir().join(format!("nova-static-{name}-{}", std::process::id()));
        std::fs::create_dir_all(root.join("css")).unwrap();
        root
    }

    #[test]
    fn resolve_stays_below_the_root() {
        let dir = StaticDir::new("/srv/public");

        assert_eq!(dir.resolve("/css/site.css"), Some(PathBuf::from("/srv/public/css/site.css")));
        assert_eq!(dir.resolve("/./index.html"), Some(PathBuf::from("/srv/public/index.html")));
        assert_eq!(dir.resolve("/../etc/passwd"), None);
        assert_eq!(dir.resolve("/css/../../secret"), None);
    }

    #[test]
    fn content_types_by_extension() {
        assert_eq!(mime_for(Path::new("index.HTML")), "text/html; charset=utf-8");
        assert_eq!(mime_for(Path::new("css/site.css")), "text/css; charset=utf-8");
        assert_eq!(mime_for(Path::new("data.json")), "application/json; charset=utf-8");
        assert_eq!(mime_for(Path::new("logo.png")), "image/png");
        assert_eq!(mime_for(Path::new("icon.svg")), "image/svg+xml");
        assert_eq!(mime_for(Path::new("blob.nova-unknown")), "application/octet-stream");
        assert_eq!(mime_for(Path::new("README")), "application/octet-stream");
    }

    #[tokio::test]
    async fn small_files_are_buffered_and_large_ones_streamed() {
        let root = temp_root("threshold");
        std::fs::write(root.join("small.bin"), b"tiny").unwrap();
        std::fs::write(root.join("css/site.css"), vec![b'a'; 64]).unwrap();
        let dir = StaticDir::new(&root).with_memory_threshold(16);

        let small = dir.fetch("/small.bin").await.unwrap().unwrap();
        assert!(matches!(small.payload, ContentPayload::Buffered(ref bytes) if bytes.as_ref() == b"tiny"));
        assert_eq!(small.content_type, "application/octet-stream");

        let large = dir.fetch("/css/site.css").await.unwrap().unwrap();
        assert_eq!(large.content_type, "text/css; charset=utf-8");
        let ContentPayload::Streamed(stream) = large.payload else {
            panic!("expected a stream");
        };
        let chunks: Vec<io::Result<Bytes>> = stream.collect().await;
        let total: usize = chunks.into_iter().map(|chunk| chunk.unwrap().len()).sum();
        assert_eq!(total, 64);
    }

    #[tokio::test]
    async fn directories_and_missing_files_are_not_found() {
        let root = temp_root("missing");
        let dir = StaticDir::new(&root);

        assert!(dir.fetch("/css").await.unwrap().is_none());
        assert!(dir.fetch("/nope.html").await.unwrap().is_none());
        assert!(dir.fetch("/../outside.html").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn static_file_serves_its_fixed_path() {
        let mut provider = MockContentProvider::new();
        provider.expect_fetch().with(eq("/docs/guide.html")).times(1).returning(|_| {
            Ok(Some(StaticContent {
                content_type: "text/html; charset=utf-8".to_string(),
                payload: ContentPayload::Buffered(Bytes::from_static(b"<h1>guide</h1>")),
            }))
        });
        let endpoint = StaticFile::with_provider("/docs/guide.html", Arc::new(provider));

        let mut req = Request::new(Method::Get, "/guide".parse().unwrap());
        let mut res = Response::new();
        endpoint.handle(&mut req, &mut res).await.unwrap();

        assert_eq!(res.status_code(), StatusCode::OK);
        assert_eq!(res.header("Content-Type"), Some("text/html; charset=utf-8"));
        let body = res.into_http().unwrap().into_body().collect().await.unwrap().to_bytes();
        assert_eq!(body, Bytes::from_static(b"<h1>guide</h1>"));
    }

    #[tokio::test]
    async fn static_file_missing_is_404() {
        let mut provider = MockContentProvider::new();
        provider.expect_fetch().returning(|_| Ok(None));
        let endpoint = StaticFile::with_provider("/gone.html", Arc::new(provider));

        let mut req = Request::new(Method::Get, "/".parse().unwrap());
        let mut res = Response::new();
        endpoint.handle(&mut req, &mut res).await.unwrap();

        assert_eq!(res.status_code(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn provider_errors_count_as_not_found() {
        let mut provider = MockContentProvider::new();
        provider.expect_fetch().returning(|_| Err(io::Error::from(io::ErrorKind::PermissionDenied)));

        let mut res = Response::new();
        assert!(!serve(&provider, "/locked.html", &mut res).await);
        assert!(res.is_absent());
    }
}
