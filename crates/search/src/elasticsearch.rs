//! Elasticsearch-backed index over its REST API.
//!
//! | Operation       | Request                                      |
//! |-----------------|----------------------------------------------|
//! | `ensure_exists` | `PUT /{index}`                               |
//! | `index`         | `PUT /{index}/_doc/{id}`                     |
//! | `delete`        | `DELETE /{index}/_doc/{id}`                  |
//! | `search`        | `POST /{index}/_search` (`multi_match`)      |
//! | `wipe`          | `POST /{index}/_delete_by_query` (match_all) |

use std::marker::PhantomData;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::SearchError;
use crate::index::{Document, Index};

/// Error type Elasticsearch reports when creating an index that exists.
const ALREADY_EXISTS: &str = "resource_already_exists_exception";

pub struct ElasticsearchIndex<T> {
    client: reqwest::Client,
    base_url: String,
    name: String,
    _document: PhantomData<fn() -> T>,
}

impl<T> ElasticsearchIndex<T> {
    pub fn new(client: reqwest::Client, base_url: &str, name: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            name: name.into(),
            _document: PhantomData,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}{}", self.base_url, self.name, path)
    }
}

#[derive(Deserialize)]
#[serde(bound = "T: DeserializeOwned")]
struct SearchResponse<T> {
    hits: Hits<T>,
}

#[derive(Deserialize)]
#[serde(bound = "T: DeserializeOwned")]
struct Hits<T> {
    hits: Vec<Hit<T>>,
}

#[derive(Deserialize)]
#[serde(bound = "T: DeserializeOwned")]
struct Hit<T> {
    #[serde(rename = "_source")]
    source: T,
}

/// Turn a non-2xx response into [`SearchError::HttpStatus`].
async fn check(response: reqwest::Response) -> Result<reqwest::Response, SearchError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(SearchError::HttpStatus {
        status: status.as_u16(),
        body,
    })
}

#[async_trait]
impl<T: Document> Index<T> for ElasticsearchIndex<T> {
    fn name(&self) -> &str {
        &self.name
    }

    async fn ensure_exists(&self) -> Result<(), SearchError> {
        let response = self.client.put(self.url("")).send().await?;
        match check(response).await {
            Ok(_) => {
                tracing::info!(index = %self.name, "Search index created");
                Ok(())
            }
            Err(SearchError::HttpStatus { status: 400, body }) if body.contains(ALREADY_EXISTS) => Ok(()),
            Err(e) => Err(e),
        }
    }

    async fn index(&self, id: &str, document: &T) -> Result<(), SearchError> {
        let response = self
            .client
            .put(self.url(&format!("/_doc/{id}")))
            .json(document)
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), SearchError> {
        let response = self
            .client
            .delete(self.url(&format!("/_doc/{id}")))
            .send()
            .await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(());
        }
        check(response).await?;
        Ok(())
    }

    async fn search(&self, query: &str) -> Result<Vec<T>, SearchError> {
        let body = if query.trim().is_empty() {
            serde_json::json!({ "query": { "match_all": {} } })
        } else {
            serde_json::json!({ "query": { "multi_match": { "query": query } } })
        };
        let response = self
            .client
            .post(self.url("/_search"))
            .json(&body)
            .send()
            .await?;
        let bytes = check(response).await?.bytes().await?;
        let parsed: SearchResponse<T> = serde_json::from_slice(&bytes)?;
        Ok(parsed.hits.hits.into_iter().map(|h| h.source).collect())
    }

    async fn wipe(&self) -> Result<(), SearchError> {
        let response = self
            .client
            .post(self.url("/_delete_by_query?conflicts=proceed"))
            .json(&serde_json::json!({ "query": { "match_all": {} } }))
            .send()
            .await?;
        check(response).await?;
        tracing::info!(index = %self.name, "Search index wiped");
        Ok(())
    }
}
