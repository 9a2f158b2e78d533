//! Periodic re-indexing of stale rows.
//!
//! [`IndexScheduler`] keeps one [`CohortProducer`] per [`IndexType`]. Each
//! tick picks one type uniformly at random, asks its producer for a bounded
//! batch of ids that need indexing, and publishes an upsert
//! [`IndexRequest`] for each. Random choice keeps every type progressing
//! while bounding the work of a single tick.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use ddb_core::IndexType;
use ddb_db::{DataManager, DbError};
use ddb_messaging::Publisher;
use prometheus::{IntCounterVec, Opts, Registry};
use rand::rngs::StdRng;
use rand::Rng;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use crate::messages::IndexRequest;

/// Counter of index requests published by the scheduler, by index type.
pub const SCHEDULED_METRIC: &str = "ddb_search_index_requests_scheduled_total";

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("Failed to produce indexing cohort for {index_type}: {source}")]
    Cohort {
        index_type: IndexType,
        #[source]
        source: DbError,
    },

    #[error("Failed to register scheduler metrics: {0}")]
    Metrics(#[from] prometheus::Error),
}

// ---------------------------------------------------------------------------
// Cohort producers
// ---------------------------------------------------------------------------

/// Returns the next bounded batch of row ids that need (re)indexing.
#[async_trait]
pub trait CohortProducer: Send + Sync {
    async fn produce(&self) -> Result<Vec<String>, DbError>;
}

/// Rows whose `last_indexed_at` is missing or older than their last update.
pub struct NeedsIndexing {
    data: Arc<dyn DataManager>,
    index_type: IndexType,
}

impl NeedsIndexing {
    pub fn new(data: Arc<dyn DataManager>, index_type: IndexType) -> Self {
        Self { data, index_type }
    }
}

#[async_trait]
impl CohortProducer for NeedsIndexing {
    async fn produce(&self) -> Result<Vec<String>, DbError> {
        self.data.get_ids_needing_indexing(self.index_type).await
    }
}

// ---------------------------------------------------------------------------
// IndexScheduler
// ---------------------------------------------------------------------------

/// Outcome of one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    pub index_type: IndexType,
    pub found: usize,
    pub published: usize,
}

pub struct IndexScheduler {
    producers: RwLock<HashMap<IndexType, Arc<dyn CohortProducer>>>,
    rng: Mutex<StdRng>,
    publisher: Arc<dyn Publisher>,
    scheduled: IntCounterVec,
}

impl std::fmt::Debug for IndexScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexScheduler").finish_non_exhaustive()
    }
}

impl IndexScheduler {
    /// Create a scheduler with no producers and register its counter on
    /// `registry`.
    pub fn new(publisher: Arc<dyn Publisher>, rng: StdRng, registry: &Registry) -> Result<Self, SchedulerError> {
        let scheduled = IntCounterVec::new(
            Opts::new(SCHEDULED_METRIC, "Search index requests published by the index scheduler"),
            &["index_type"],
        )?;
        registry.register(Box::new(scheduled.clone()))?;

        Ok(Self {
            producers: RwLock::new(HashMap::new()),
            rng: Mutex::new(rng),
            publisher,
            scheduled,
        })
    }

    /// A scheduler with a [`NeedsIndexing`] producer for every index type.
    pub async fn with_default_producers(
        data: Arc<dyn DataManager>,
        publisher: Arc<dyn Publisher>,
        rng: StdRng,
        registry: &Registry,
    ) -> Result<Self, SchedulerError> {
        let scheduler = Self::new(publisher, rng, registry)?;
        for &index_type in IndexType::ALL {
            scheduler
                .register(index_type, Arc::new(NeedsIndexing::new(data.clone(), index_type)))
                .await;
        }
        Ok(scheduler)
    }

    pub async fn register(&self, index_type: IndexType, producer: Arc<dyn CohortProducer>) {
        self.producers.write().await.insert(index_type, producer);
    }

    /// Total requests published for `index_type` so far.
    pub fn scheduled_count(&self, index_type: IndexType) -> u64 {
        self.scheduled.with_label_values(&[index_type.as_str()]).get()
    }

    /// Run one scheduling round. Returns `None` when no producers are
    /// registered.
    pub async fn tick(&self) -> Result<Option<TickReport>, SchedulerError> {
        let (index_type, producer) = {
            let producers = self.producers.read().await;
            let mut types: Vec<IndexType> = producers.keys().copied().collect();
            if types.is_empty() {
                return Ok(None);
            }
            types.sort();
            let pick = {
                let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
                rng.random_range(0..types.len())
            };
            let index_type = types[pick];
            (index_type, producers[&index_type].clone())
        };

        let ids = match producer.produce().await {
            Ok(ids) => ids,
            Err(e) if e.is_not_found() => Vec::new(),
            Err(source) => return Err(SchedulerError::Cohort { index_type, source }),
        };

        let mut published = 0;
        for id in &ids {
            match self.publisher.publish(&IndexRequest::upsert(index_type, id.as_str())).await {
                Ok(()) => published += 1,
                Err(e) => tracing::error!(index_type = %index_type, row_id = %id, error = %e, "Failed to schedule index request"),
            }
        }

        self.scheduled
            .with_label_values(&[index_type.as_str()])
            .inc_by(published as u64);

        if !ids.is_empty() {
            tracing::info!(index_type = %index_type, found = ids.len(), published, "Scheduled search index requests");
        }

        Ok(Some(TickReport {
            index_type,
            found: ids.len(),
            published,
        }))
    }

    /// Tick every `period` until `cancel` fires. Tick errors are logged.
    pub async fn run(&self, cancel: CancellationToken, period: Duration) {
        let mut interval = tokio::time::interval(period);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Index scheduler cancelled");
                    break;
                }
                _ = interval.tick() => {
                    if let Err(e) = self.tick().await {
                        tracing::error!(error = %e, "Index scheduler tick failed");
                    }
                }
            }
        }
    }
}
