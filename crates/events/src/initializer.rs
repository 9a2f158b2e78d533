//! Full (re)build of search indexes.
//!
//! [`SearchIndexInitializer`] pages through every live row of each requested
//! index type and feeds one upsert [`IndexRequest`] per row through a bounded
//! channel to a task running the [`IndexDispatcher`]. With `wipe`, each index
//! is emptied first, at most once per initializer, however often its type
//! is requested.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use ddb_core::IndexType;
use ddb_db::DbError;
use tokio::sync::{mpsc, OnceCell};

use crate::indexing::{IndexDispatcher, IndexOutcome, IndexingError, RowIndexer};
use crate::messages::IndexRequest;

/// Rows fetched per datastore page.
pub const PAGE_SIZE: i64 = 50;

/// Requests buffered between the pager and the dispatcher task.
const CHANNEL_CAPACITY: usize = 256;

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum InitializerError {
    #[error("No indexer registered for {0}")]
    UnknownIndex(IndexType),

    #[error("Failed to prepare {index_type} index: {source}")]
    Prepare {
        index_type: IndexType,
        #[source]
        source: IndexingError,
    },

    #[error("Failed to page ids for {index_type}: {source}")]
    Paging {
        index_type: IndexType,
        #[source]
        source: DbError,
    },

    #[error("Index dispatcher task stopped unexpectedly")]
    DispatcherGone,
}

// ---------------------------------------------------------------------------
// ManagedIndex
// ---------------------------------------------------------------------------

/// One index under initialization, with its own wipe-once guard.
pub struct ManagedIndex {
    indexer: Arc<dyn RowIndexer>,
    wiped: OnceCell<()>,
}

impl ManagedIndex {
    pub fn new(indexer: Arc<dyn RowIndexer>) -> Self {
        Self {
            indexer,
            wiped: OnceCell::new(),
        }
    }

    /// Create the backing index and, if asked, wipe it. Only the first
    /// successful wipe runs.
    pub async fn prepare(&self, wipe: bool) -> Result<(), IndexingError> {
        self.indexer.ensure_exists().await?;
        if wipe {
            self.wiped
                .get_or_try_init(|| async {
                    self.indexer.wipe().await?;
                    tracing::info!(index_type = %self.indexer.index_type(), "Search index wiped");
                    Ok::<(), IndexingError>(())
                })
                .await?;
        }
        Ok(())
    }

    pub fn was_wiped(&self) -> bool {
        self.wiped.initialized()
    }
}

// ---------------------------------------------------------------------------
// SearchIndexInitializer
// ---------------------------------------------------------------------------

/// Totals from one [`SearchIndexInitializer::run`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InitializationReport {
    /// Requests queued per index type.
    pub queued: BTreeMap<IndexType, usize>,
    pub indexed: usize,
    pub failed: usize,
}

pub struct SearchIndexInitializer {
    dispatcher: Arc<IndexDispatcher>,
    managed: HashMap<IndexType, ManagedIndex>,
}

impl SearchIndexInitializer {
    pub fn new(dispatcher: Arc<IndexDispatcher>) -> Self {
        let managed = IndexType::ALL
            .iter()
            .filter_map(|&t| dispatcher.indexer(t).map(|i| (t, ManagedIndex::new(i))))
            .collect();
        Self { dispatcher, managed }
    }

    pub fn managed(&self, index_type: IndexType) -> Option<&ManagedIndex> {
        self.managed.get(&index_type)
    }

    /// Index every live row of each type in `types`.
    pub async fn run(&self, types: &[IndexType], wipe: bool) -> Result<InitializationReport, InitializerError> {
        let (tx, mut rx) = mpsc::channel::<IndexRequest>(CHANNEL_CAPACITY);

        let dispatcher = self.dispatcher.clone();
        let worker = tokio::spawn(async move {
            let (mut indexed, mut failed) = (0usize, 0usize);
            while let Some(request) = rx.recv().await {
                match dispatcher.handle(&request).await {
                    Ok(IndexOutcome::Indexed) => indexed += 1,
                    Ok(_) => {}
                    Err(e) => {
                        failed += 1;
                        tracing::error!(row_id = %request.row_id, index_type = %request.index_type, error = %e, "Failed to index row");
                    }
                }
            }
            (indexed, failed)
        });

        let queued = self.feed(types, wipe, &tx).await;
        drop(tx);

        let (indexed, failed) = worker.await.map_err(|_| InitializerError::DispatcherGone)?;
        let queued = queued?;

        tracing::info!(indexed, failed, "Search index initialization finished");
        Ok(InitializationReport {
            queued,
            indexed,
            failed,
        })
    }

    async fn feed(
        &self,
        types: &[IndexType],
        wipe: bool,
        tx: &mpsc::Sender<IndexRequest>,
    ) -> Result<BTreeMap<IndexType, usize>, InitializerError> {
        let mut queued = BTreeMap::new();

        for &index_type in types {
            let managed = self
                .managed
                .get(&index_type)
                .ok_or(InitializerError::UnknownIndex(index_type))?;
            managed
                .prepare(wipe)
                .await
                .map_err(|source| InitializerError::Prepare { index_type, source })?;

            let count = queued.entry(index_type).or_insert(0usize);
            let mut offset = 0i64;
            loop {
                let ids = self
                    .dispatcher
                    .data()
                    .get_ids_for_index(index_type, offset, PAGE_SIZE)
                    .await
                    .map_err(|source| InitializerError::Paging { index_type, source })?;
                if ids.is_empty() {
                    break;
                }
                offset += ids.len() as i64;
                for id in ids {
                    tx.send(IndexRequest::upsert(index_type, id))
                        .await
                        .map_err(|_| InitializerError::DispatcherGone)?;
                    *count += 1;
                }
            }
            tracing::info!(index_type = %index_type, queued = *count, "Queued rows for indexing");
        }

        Ok(queued)
    }
}
