//! Location-mapped file fetcher
//!
//! Maps document locations (IRIs) to local files, so that a generation plan
//! written against remote IRIs can run against local copies. Mappings are
//! given programmatically or as a `IRI=/path/to/file;IRI2=/path/to/file2`
//! string. `file://` IRIs are served directly.

use super::{DocumentFetcher, LookUpRequest, TypedStream};
use crate::error::{GenerateError, Result};
use async_trait::async_trait;
use fluree_vocab::media_types;
use std::collections::HashMap;
use std::io::BufReader;
use std::path::{Path, PathBuf};

/// Fetcher serving local files for mapped locations
#[derive(Debug, Clone, Default)]
pub struct LocationMappedFetcher {
    mappings: HashMap<String, PathBuf>,
    /// Serve `file://` IRIs that are not explicitly mapped
    serve_file_iris: bool,
}

impl LocationMappedFetcher {
    /// Create an empty fetcher that serves `file://` IRIs
    pub fn new() -> Self {
        Self {
            mappings: HashMap::new(),
            serve_file_iris: true,
        }
    }

    /// Parse a `IRI=/path;IRI2=/path2` mapping string
    ///
    /// Empty segments are ignored. A segment without `=` or with an empty
    /// side is a configuration error.
    pub fn from_mapping_str(config: &str) -> Result<Self> {
        let mut fetcher = Self::new();
        for segment in config.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            let (iri, path) = segment.split_once('=').ok_or_else(|| {
                GenerateError::Configuration(format!(
                    "invalid location mapping '{segment}': expected IRI=/path/to/file"
                ))
            })?;
            let (iri, path) = (iri.trim(), path.trim());
            if iri.is_empty() || path.is_empty() {
                return Err(GenerateError::Configuration(format!(
                    "invalid location mapping '{segment}': empty IRI or path"
                )));
            }
            fetcher = fetcher.with_mapping(iri, path);
        }
        Ok(fetcher)
    }

    /// Add a mapping from a location to a local file
    pub fn with_mapping(mut self, location: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        self.mappings.insert(location.into(), path.into());
        self
    }

    /// Enable or disable direct `file://` access
    pub fn with_file_iris(mut self, enabled: bool) -> Self {
        self.serve_file_iris = enabled;
        self
    }

    /// Local path for a location, if any
    pub fn resolve(&self, location: &str) -> Option<PathBuf> {
        if let Some(path) = self.mappings.get(location) {
            return Some(path.clone());
        }
        if self.serve_file_iris {
            if let Some(rest) = location.strip_prefix("file://") {
                return Some(PathBuf::from(rest));
            }
        }
        None
    }
}

#[async_trait]
impl DocumentFetcher for LocationMappedFetcher {
    async fn open(&self, request: &LookUpRequest) -> Option<TypedStream> {
        let path = self.resolve(&request.location)?;
        match tokio::fs::File::open(&path).await {
            Ok(file) => {
                let file = file.into_std().await;
                let media_type = guess_media_type(&path).map(str::to_string);
                tracing::debug!(
                    request = %request,
                    path = %path.display(),
                    media_type = ?media_type,
                    "opened mapped file"
                );
                Some(TypedStream::new(Box::new(BufReader::new(file)), media_type))
            }
            Err(e) => {
                tracing::warn!(
                    request = %request,
                    path = %path.display(),
                    error = %e,
                    "mapped file could not be opened"
                );
                None
            }
        }
    }
}

/// Guess a media type from a file extension
pub fn guess_media_type(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    let media_type = match ext.as_str() {
        "json" | "geojson" => media_types::APPLICATION_JSON,
        "csv" => media_types::TEXT_CSV,
        "xml" => media_types::APPLICATION_XML,
        "html" | "htm" => media_types::TEXT_HTML,
        "ttl" => media_types::TEXT_TURTLE,
        "txt" => media_types::TEXT_PLAIN,
        _ => return None,
    };
    Some(media_type)
}
