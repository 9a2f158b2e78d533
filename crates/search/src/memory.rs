//! In-process index used by single-node deployments and tests.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::SearchError;
use crate::index::{Document, Index};

/// Stores documents in a sorted map. Search is a case-insensitive substring
/// match over every top-level string field.
pub struct MemoryIndex<T> {
    name: String,
    documents: RwLock<BTreeMap<String, T>>,
}

impl<T: Document> MemoryIndex<T> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            documents: RwLock::new(BTreeMap::new()),
        }
    }

    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.documents.read().await.is_empty()
    }

    pub async fn get(&self, id: &str) -> Option<T> {
        self.documents.read().await.get(id).cloned()
    }
}

fn matches(document: &serde_json::Value, needle: &str) -> bool {
    match document {
        serde_json::Value::Object(fields) => fields.values().any(|v| match v {
            serde_json::Value::String(s) => s.to_lowercase().contains(needle),
            _ => false,
        }),
        _ => false,
    }
}

#[async_trait]
impl<T: Document> Index<T> for MemoryIndex<T> {
    fn name(&self) -> &str {
        &self.name
    }

    async fn index(&self, id: &str, document: &T) -> Result<(), SearchError> {
        self.documents
            .write()
            .await
            .insert(id.to_string(), document.clone());
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), SearchError> {
        self.documents.write().await.remove(id);
        Ok(())
    }

    async fn search(&self, query: &str) -> Result<Vec<T>, SearchError> {
        let needle = query.trim().to_lowercase();
        let documents = self.documents.read().await;
        let mut hits = Vec::new();
        for document in documents.values() {
            let value = serde_json::to_value(document)?;
            if needle.is_empty() || matches(&value, &needle) {
                hits.push(document.clone());
            }
        }
        Ok(hits)
    }

    async fn wipe(&self) -> Result<(), SearchError> {
        self.documents.write().await.clear();
        Ok(())
    }
}
