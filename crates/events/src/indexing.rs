//! Search-index dispatch.
//!
//! Each [`IndexType`] is served by one [`Indexer<T>`], which knows how to load
//! a row as its search document `T` and which [`Index<T>`] stores it. The
//! typed indexers sit behind the object-safe [`RowIndexer`] so the
//! [`IndexDispatcher`] can route requests by type.
//!
//! Upserts load, index, then mark the row indexed, in that order. Deletes
//! never touch the datastore.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use ddb_core::IndexType;
use ddb_db::models::{MealSearchSubset, RecipeSearchSubset, ReferenceSearchSubset, UserSearchSubset};
use ddb_db::{DataManager, DbError};
use ddb_messaging::{decode, HandlerError, MessageHandler};
use ddb_search::{Document, Index, SearchConfig, SearchError};
use futures::future::BoxFuture;

use crate::messages::IndexRequest;

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum IndexingError {
    #[error(transparent)]
    Search(#[from] SearchError),

    #[error(transparent)]
    Data(#[from] DbError),
}

/// What the dispatcher did with a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexOutcome {
    Indexed,
    Deleted,
    /// Invalid row id, unknown index type, or no indexer registered.
    Ignored,
}

// ---------------------------------------------------------------------------
// Loaders
// ---------------------------------------------------------------------------

/// Reads one row and projects it to its search document.
pub type Loader<T> = for<'a> fn(&'a dyn DataManager, &'a str) -> BoxFuture<'a, Result<T, DbError>>;

macro_rules! loaders {
    ($($name:ident: $method:ident => $doc:ty;)+) => {
        $(
            pub fn $name<'a>(data: &'a dyn DataManager, id: &'a str) -> BoxFuture<'a, Result<$doc, DbError>> {
                Box::pin(async move { data.$method(id).await.map(|row| <$doc>::from(&row)) })
            }
        )+
    };
}

/// Row loaders for every searchable entity.
pub mod loaders {
    use super::*;

    loaders! {
        user: get_user => UserSearchSubset;
        recipe: get_recipe => RecipeSearchSubset;
        meal: get_meal => MealSearchSubset;
        valid_ingredient: get_valid_ingredient => ReferenceSearchSubset;
        valid_instrument: get_valid_instrument => ReferenceSearchSubset;
        valid_preparation: get_valid_preparation => ReferenceSearchSubset;
        valid_measurement_unit: get_valid_measurement_unit => ReferenceSearchSubset;
        valid_ingredient_state: get_valid_ingredient_state => ReferenceSearchSubset;
        valid_vessel: get_valid_vessel => ReferenceSearchSubset;
    }
}

// ---------------------------------------------------------------------------
// Indexers
// ---------------------------------------------------------------------------

/// Type-erased view of an [`Indexer<T>`].
#[async_trait]
pub trait RowIndexer: Send + Sync {
    fn index_type(&self) -> IndexType;

    async fn ensure_exists(&self) -> Result<(), IndexingError>;

    /// Load `id`, store its document, then mark it indexed.
    async fn upsert(&self, data: &dyn DataManager, id: &str) -> Result<(), IndexingError>;

    async fn delete(&self, id: &str) -> Result<(), IndexingError>;

    async fn wipe(&self) -> Result<(), IndexingError>;
}

pub struct Indexer<T: Document> {
    index_type: IndexType,
    index: Arc<dyn Index<T>>,
    loader: Loader<T>,
}

impl<T: Document> Indexer<T> {
    pub fn new(index_type: IndexType, index: Arc<dyn Index<T>>, loader: Loader<T>) -> Self {
        Self {
            index_type,
            index,
            loader,
        }
    }
}

#[async_trait]
impl<T: Document> RowIndexer for Indexer<T> {
    fn index_type(&self) -> IndexType {
        self.index_type
    }

    async fn ensure_exists(&self) -> Result<(), IndexingError> {
        Ok(self.index.ensure_exists().await?)
    }

    async fn upsert(&self, data: &dyn DataManager, id: &str) -> Result<(), IndexingError> {
        let document = (self.loader)(data, id).await?;
        self.index.index(id, &document).await?;
        data.mark_as_indexed(self.index_type, id).await?;
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), IndexingError> {
        Ok(self.index.delete(id).await?)
    }

    async fn wipe(&self) -> Result<(), IndexingError> {
        Ok(self.index.wipe().await?)
    }
}

/// One indexer per [`IndexType`], each on the backend `search` selects.
pub fn standard_indexers(search: &SearchConfig) -> Vec<Arc<dyn RowIndexer>> {
    fn make<T: Document>(search: &SearchConfig, index_type: IndexType, loader: Loader<T>) -> Arc<dyn RowIndexer> {
        Arc::new(Indexer::new(index_type, search.provide_index::<T>(index_type), loader))
    }

    IndexType::ALL
        .iter()
        .map(|&index_type| match index_type {
            IndexType::Users => make::<UserSearchSubset>(search, index_type, loaders::user),
            IndexType::Recipes => make::<RecipeSearchSubset>(search, index_type, loaders::recipe),
            IndexType::Meals => make::<MealSearchSubset>(search, index_type, loaders::meal),
            IndexType::ValidIngredients => make::<ReferenceSearchSubset>(search, index_type, loaders::valid_ingredient),
            IndexType::ValidInstruments => make::<ReferenceSearchSubset>(search, index_type, loaders::valid_instrument),
            IndexType::ValidPreparations => make::<ReferenceSearchSubset>(search, index_type, loaders::valid_preparation),
            IndexType::ValidMeasurementUnits => make::<ReferenceSearchSubset>(search, index_type, loaders::valid_measurement_unit),
            IndexType::ValidIngredientStates => make::<ReferenceSearchSubset>(search, index_type, loaders::valid_ingredient_state),
            IndexType::ValidVessels => make::<ReferenceSearchSubset>(search, index_type, loaders::valid_vessel),
        })
        .collect()
}

// ---------------------------------------------------------------------------
// IndexDispatcher
// ---------------------------------------------------------------------------

/// Routes [`IndexRequest`]s to the indexer for their type.
pub struct IndexDispatcher {
    data: Arc<dyn DataManager>,
    indexers: HashMap<IndexType, Arc<dyn RowIndexer>>,
}

impl IndexDispatcher {
    pub fn new(data: Arc<dyn DataManager>, indexers: impl IntoIterator<Item = Arc<dyn RowIndexer>>) -> Self {
        let indexers = indexers.into_iter().map(|i| (i.index_type(), i)).collect();
        Self { data, indexers }
    }

    pub fn indexer(&self, index_type: IndexType) -> Option<Arc<dyn RowIndexer>> {
        self.indexers.get(&index_type).cloned()
    }

    pub fn data(&self) -> &Arc<dyn DataManager> {
        &self.data
    }

    #[tracing::instrument(skip_all, fields(row_id = %request.row_id, index_type = %request.index_type))]
    pub async fn handle(&self, request: &IndexRequest) -> Result<IndexOutcome, IndexingError> {
        let index_type = match request.validate() {
            Ok(index_type) => index_type,
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring invalid index request");
                return Ok(IndexOutcome::Ignored);
            }
        };
        let Some(indexer) = self.indexers.get(&index_type) else {
            tracing::warn!("No indexer registered for index type");
            return Ok(IndexOutcome::Ignored);
        };

        if request.delete {
            indexer.delete(&request.row_id).await?;
            tracing::debug!("Removed row from search index");
            Ok(IndexOutcome::Deleted)
        } else {
            indexer.upsert(self.data.as_ref(), &request.row_id).await?;
            tracing::debug!("Indexed row");
            Ok(IndexOutcome::Indexed)
        }
    }
}

#[async_trait]
impl MessageHandler for IndexDispatcher {
    async fn handle(&self, payload: &[u8]) -> Result<(), HandlerError> {
        let request: IndexRequest = decode(payload)?;
        IndexDispatcher::handle(self, &request).await?;
        Ok(())
    }
}
