//! In-memory document fetcher for testing and embedded use
//!
//! Documents are stored in a `HashMap` behind `Arc<RwLock>`, making the
//! fetcher cheap to clone and safe to share across concurrent plans.

use super::{DocumentFetcher, LookUpRequest, TypedStream};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;

#[derive(Clone)]
struct StoredDocument {
    body: Arc<[u8]>,
    media_type: Option<String>,
}

/// In-memory document fetcher
///
/// The ACCEPT header of a request is not used to select among
/// representations: one document is stored per location.
#[derive(Clone, Default)]
pub struct MemoryFetcher {
    documents: Arc<RwLock<HashMap<String, StoredDocument>>>,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a document
    pub fn insert(
        &self,
        location: impl Into<String>,
        body: impl Into<Vec<u8>>,
        media_type: Option<&str>,
    ) {
        self.documents.write().insert(
            location.into(),
            StoredDocument {
                body: Arc::from(body.into()),
                media_type: media_type.map(str::to_string),
            },
        );
    }

    /// Builder-style `insert`
    pub fn with_document(
        self,
        location: impl Into<String>,
        body: impl Into<Vec<u8>>,
        media_type: Option<&str>,
    ) -> Self {
        self.insert(location, body, media_type);
        self
    }

    /// Remove a document
    pub fn remove(&self, location: &str) -> bool {
        self.documents.write().remove(location).is_some()
    }

    /// Number of registered documents
    pub fn len(&self) -> usize {
        self.documents.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.read().is_empty()
    }
}

impl Debug for MemoryFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryFetcher")
            .field("document_count", &self.documents.read().len())
            .finish()
    }
}

#[async_trait]
impl DocumentFetcher for MemoryFetcher {
    async fn open(&self, request: &LookUpRequest) -> Option<TypedStream> {
        let doc = self.documents.read().get(&request.location).cloned();
        match doc {
            Some(doc) => {
                tracing::trace!(request = %request, bytes = doc.body.len(), "memory document hit");
                Some(TypedStream::from_bytes(doc.body.to_vec(), doc.media_type))
            }
            None => {
                tracing::debug!(request = %request, "memory document not found");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_insert_and_open() {
        let fetcher = MemoryFetcher::new().with_document(
            "http://ex.org/doc.json",
            r#"{"a":1}"#,
            Some("application/json"),
        );
        assert_eq!(fetcher.len(), 1);

        let stream = fetcher
            .open(&LookUpRequest::new("http://ex.org/doc.json", "application/json"))
            .await
            .unwrap();
        assert_eq!(stream.media_type(), Some("application/json"));
        assert_eq!(stream.read_to_string().unwrap(), r#"{"a":1}"#);
    }

    #[tokio::test]
    async fn test_missing_and_remove() {
        let fetcher = MemoryFetcher::new();
        fetcher.insert("urn:a", "x", None);
        assert!(fetcher.remove("urn:a"));
        assert!(!fetcher.remove("urn:a"));
        assert!(fetcher.is_empty());
        assert!(fetcher.open(&LookUpRequest::new("urn:a", "*/*")).await.is_none());
    }
}
