//! The backend-agnostic index contract.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::SearchError;

/// Anything that can be stored in an index.
///
/// Blanket-implemented; documents are the search-subset projections of
/// datastore rows.
pub trait Document: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {}

impl<T> Document for T where T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {}

/// A named search index holding documents of type `T`, keyed by row id.
#[async_trait]
pub trait Index<T: Document>: Send + Sync {
    /// Name of the backing index.
    fn name(&self) -> &str;

    /// Create the backing index if it does not exist yet.
    async fn ensure_exists(&self) -> Result<(), SearchError> {
        Ok(())
    }

    /// Insert or replace the document stored under `id`.
    async fn index(&self, id: &str, document: &T) -> Result<(), SearchError>;

    /// Remove the document stored under `id`. Deleting a missing id succeeds.
    async fn delete(&self, id: &str) -> Result<(), SearchError>;

    /// Full-text search across the documents' fields.
    async fn search(&self, query: &str) -> Result<Vec<T>, SearchError>;

    /// Remove every document from the index.
    async fn wipe(&self) -> Result<(), SearchError>;
}
