//! Document fetching
//!
//! The `DocumentFetcher` trait is the seam between generation plans and
//! wherever documents live. A fetch either yields a `TypedStream` (a reader
//! tagged with the resolved media type) or `None`. Fetchers never return
//! errors for ordinary resolution failures; they log and answer `None`.
//!
//! Implementations:
//! - [`MemoryFetcher`]: documents registered in memory
//! - [`LocationMappedFetcher`]: location IRIs mapped to local files
//! - [`HttpFetcher`]: HTTP(S) GET with content negotiation (feature `http`)
//! - [`FallbackFetcher`]: tries several fetchers in order

mod file;
#[cfg(feature = "http")]
mod http;
mod memory;

pub use file::{guess_media_type, LocationMappedFetcher};
#[cfg(feature = "http")]
pub use http::HttpFetcher;
pub use memory::MemoryFetcher;

use async_trait::async_trait;
use std::fmt;
use std::io::{Cursor, Read};
use std::sync::Arc;

/// A document lookup: location plus accepted media type
///
/// Equal requests are interchangeable (e.g. for caching by a fetcher).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct LookUpRequest {
    /// Location of the document (usually an IRI)
    pub location: String,
    /// Accepted media type, e.g. `application/json` or `*/*`
    pub accept: String,
}

impl LookUpRequest {
    pub fn new(location: impl Into<String>, accept: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            accept: accept.into(),
        }
    }
}

impl fmt::Display for LookUpRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}> ACCEPT {}", self.location, self.accept)
    }
}

/// A byte stream tagged with its resolved media type
///
/// The stream owns its reader; dropping it releases the underlying resource.
pub struct TypedStream {
    media_type: Option<String>,
    reader: Box<dyn Read + Send>,
}

impl TypedStream {
    /// Wrap a reader
    pub fn new(reader: Box<dyn Read + Send>, media_type: Option<String>) -> Self {
        Self { media_type, reader }
    }

    /// Wrap an in-memory document
    pub fn from_bytes(bytes: impl Into<Vec<u8>>, media_type: Option<String>) -> Self {
        Self::new(Box::new(Cursor::new(bytes.into())), media_type)
    }

    /// Declared content type, without parameters
    pub fn media_type(&self) -> Option<&str> {
        self.media_type.as_deref()
    }

    /// Take the reader, dropping the media type
    pub fn into_reader(self) -> Box<dyn Read + Send> {
        self.reader
    }

    /// Read the whole stream as UTF-8 text
    ///
    /// Network-backed readers block, so async callers run this on the
    /// blocking pool.
    pub fn read_to_string(mut self) -> std::io::Result<String> {
        let mut buf = Vec::new();
        self.reader.read_to_end(&mut buf)?;
        String::from_utf8(buf)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }
}

impl fmt::Debug for TypedStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedStream")
            .field("media_type", &self.media_type)
            .finish_non_exhaustive()
    }
}

/// Opens documents for generation plans
///
/// Implementations must be safe for concurrent use by independent SOURCE
/// and ITERATOR invocations.
#[async_trait]
pub trait DocumentFetcher: fmt::Debug + Send + Sync {
    /// Open a document
    ///
    /// Returns `None` when the document cannot be found or retrieved.
    async fn open(&self, request: &LookUpRequest) -> Option<TypedStream>;
}

#[async_trait]
impl<T: DocumentFetcher + ?Sized> DocumentFetcher for Arc<T> {
    async fn open(&self, request: &LookUpRequest) -> Option<TypedStream> {
        (**self).open(request).await
    }
}

/// A fetcher that never finds anything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpFetcher;

#[async_trait]
impl DocumentFetcher for NoOpFetcher {
    async fn open(&self, request: &LookUpRequest) -> Option<TypedStream> {
        tracing::debug!(request = %request, "no document fetcher configured");
        None
    }
}

/// Tries each fetcher in order; the first hit wins
#[derive(Debug, Default)]
pub struct FallbackFetcher {
    fetchers: Vec<Arc<dyn DocumentFetcher>>,
}

impl FallbackFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a fetcher to the chain
    pub fn with(mut self, fetcher: Arc<dyn DocumentFetcher>) -> Self {
        self.fetchers.push(fetcher);
        self
    }
}

#[async_trait]
impl DocumentFetcher for FallbackFetcher {
    async fn open(&self, request: &LookUpRequest) -> Option<TypedStream> {
        for fetcher in &self.fetchers {
            if let Some(stream) = fetcher.open(request).await {
                return Some(stream);
            }
        }
        None
    }
}

/// Strip parameters (`; charset=...`) from a content type header value
pub(crate) fn content_type_essence(content_type: &str) -> Option<String> {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    if essence.is_empty() {
        None
    } else {
        Some(essence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_to_string() {
        let stream = TypedStream::from_bytes("héllo", Some("text/plain".into()));
        assert_eq!(stream.media_type(), Some("text/plain"));
        assert_eq!(stream.read_to_string().unwrap(), "héllo");
    }

    #[test]
    fn test_read_invalid_utf8() {
        let stream = TypedStream::from_bytes(vec![0xff, 0xfe], None);
        let err = stream.read_to_string().unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_content_type_essence() {
        assert_eq!(
            content_type_essence("Application/JSON; charset=utf-8").as_deref(),
            Some("application/json")
        );
        assert_eq!(content_type_essence(" ; q=1"), None);
    }

    #[tokio::test]
    async fn test_fallback_first_hit_wins() {
        let first = MemoryFetcher::new();
        let second = MemoryFetcher::new();
        first.insert("http://ex.org/a", "first", Some("text/plain"));
        second.insert("http://ex.org/a", "second", Some("text/plain"));
        second.insert("http://ex.org/b", "only-second", None);

        let chain = FallbackFetcher::new()
            .with(Arc::new(NoOpFetcher))
            .with(Arc::new(first))
            .with(Arc::new(second));

        let a = chain
            .open(&LookUpRequest::new("http://ex.org/a", "*/*"))
            .await
            .unwrap();
        assert_eq!(a.read_to_string().unwrap(), "first");

        let b = chain
            .open(&LookUpRequest::new("http://ex.org/b", "*/*"))
            .await
            .unwrap();
        assert_eq!(b.read_to_string().unwrap(), "only-second");

        assert!(chain
            .open(&LookUpRequest::new("http://ex.org/missing", "*/*"))
            .await
            .is_none());
    }
}
