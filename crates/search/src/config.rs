//! Backend selection from the environment.
//!
//! | Env var                     | Default  |
//! |-----------------------------|----------|
//! | `SEARCH_PROVIDER`           | `memory` |
//! | `ELASTICSEARCH_URL`         | (required for elasticsearch) |
//! | `SEARCH_REQUEST_TIMEOUT_SECS` | `10`   |

use std::sync::Arc;
use std::time::Duration;

use ddb_core::IndexType;

use crate::elasticsearch::ElasticsearchIndex;
use crate::error::SearchError;
use crate::index::{Document, Index};
use crate::memory::MemoryIndex;

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchBackend {
    Memory,
    Elasticsearch { url: String },
}

/// Hands out one [`Index`] per [`IndexType`] on the configured backend.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    pub backend: SearchBackend,
    client: reqwest::Client,
}

impl SearchConfig {
    pub fn new(backend: SearchBackend, request_timeout: Duration) -> Result<Self, SearchError> {
        let client = reqwest::Client::builder().timeout(request_timeout).build()?;
        Ok(Self { backend, client })
    }

    /// Read the backend configuration from environment variables.
    pub fn from_env() -> Result<Self, SearchError> {
        let provider = std::env::var("SEARCH_PROVIDER").unwrap_or_else(|_| "memory".into());
        let backend = parse_backend(&provider, std::env::var("ELASTICSEARCH_URL").ok())?;
        let timeout_secs = std::env::var("SEARCH_REQUEST_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);
        Self::new(backend, Duration::from_secs(timeout_secs))
    }

    /// Build the index backing `index_type`. The index is named after the
    /// type (`recipes`, `valid_vessels`, ...).
    pub fn provide_index<T: Document>(&self, index_type: IndexType) -> Arc<dyn Index<T>> {
        match &self.backend {
            SearchBackend::Memory => Arc::new(MemoryIndex::<T>::new(index_type.as_str())),
            SearchBackend::Elasticsearch { url } => Arc::new(ElasticsearchIndex::<T>::new(
                self.client.clone(),
                url,
                index_type.as_str(),
            )),
        }
    }
}

fn parse_backend(provider: &str, url: Option<String>) -> Result<SearchBackend, SearchError> {
    match provider.trim().to_ascii_lowercase().as_str() {
        "" | "memory" => Ok(SearchBackend::Memory),
        "elasticsearch" => url
            .filter(|u| !u.trim().is_empty())
            .map(|url| SearchBackend::Elasticsearch { url })
            .ok_or_else(|| SearchError::Config("ELASTICSEARCH_URL is required for the elasticsearch provider".into())),
        other => Err(SearchError::Config(format!("unknown search provider: {other}"))),
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn parses_backends() {
        assert_eq!(parse_backend("memory", None).unwrap(), SearchBackend::Memory);
        assert_eq!(
            parse_backend("Elasticsearch", Some("http://es:9200".into())).unwrap(),
            SearchBackend::Elasticsearch {
                url: "http://es:9200".into()
            }
        );
        assert_matches!(parse_backend("elasticsearch", None), Err(SearchError::Config(_)));
        assert_matches!(parse_backend("algolia", None), Err(SearchError::Config(_)));
    }

    #[test]
    fn provided_index_is_named_after_type() {
        let config = SearchConfig::new(SearchBackend::Memory, Duration::from_secs(1)).unwrap();
        let index = config.provide_index::<serde_json::Value>(IndexType::ValidVessels);
        assert_eq!(index.name(), "valid_vessels");
    }
}
