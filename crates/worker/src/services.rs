//! Assembly of the worker's consumers and periodic jobs.
//!
//! [`Collaborators`] picks the external backends from the environment,
//! [`Worker::assemble`] builds one handler per topic on top of them, and
//! [`Worker::run`] binds those handlers to the broker and starts the index
//! scheduler and maintenance sweeper. Everything stops on one shared
//! [`CancellationToken`].

use std::sync::Arc;
use std::time::Duration;

use ddb_core::IndexType;
use ddb_db::DataManager;
use ddb_events::analytics::reporter_from_env;
use ddb_events::delivery::email::{EmailConfig, EmailError};
use ddb_events::scheduler::SchedulerError;
use ddb_events::storage::{store_from_env, StorageError};
use ddb_events::{
    standard_indexers, DataChangeFanout, EmailDeliveryHandler, Emailer, EventReporter, IndexDispatcher, IndexScheduler,
    MaintenanceSweeper, NoopEmailer, NotificationDispatcher, ObjectStore, SmtpEmailer, UserDataAggregator,
    WebhookExecutor,
};
use ddb_messaging::{topics, Broker, MessageHandler, MessagingError};
use ddb_search::{SearchConfig, SearchError};
use prometheus::Registry;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::config::WorkerConfig;

/// Buffer for handler errors awaiting the error logger.
const ERROR_CHANNEL_CAPACITY: usize = 256;

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Messaging(#[from] MessagingError),

    #[error(transparent)]
    Search(#[from] SearchError),

    #[error(transparent)]
    Email(#[from] EmailError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
}

// ---------------------------------------------------------------------------
// Collaborators
// ---------------------------------------------------------------------------

/// The external systems the handlers talk to.
pub struct Collaborators {
    pub search: SearchConfig,
    pub reporter: Arc<dyn EventReporter>,
    pub emailer: Arc<dyn Emailer>,
    pub store: Arc<dyn ObjectStore>,
}

impl Collaborators {
    /// Choose every backend from its environment variables. Email falls back
    /// to [`NoopEmailer`] when `SMTP_HOST` is unset.
    pub async fn from_env() -> Result<Self, ServiceError> {
        let emailer: Arc<dyn Emailer> = match EmailConfig::from_env() {
            Some(config) => {
                tracing::info!(host = %config.smtp_host, port = config.smtp_port, "SMTP email transport configured");
                Arc::new(SmtpEmailer::new(&config)?)
            }
            None => {
                tracing::warn!("SMTP_HOST not set, outbound emails will be dropped");
                Arc::new(NoopEmailer)
            }
        };

        Ok(Self {
            search: SearchConfig::from_env()?,
            reporter: reporter_from_env(),
            emailer,
            store: store_from_env().await?,
        })
    }
}

// ---------------------------------------------------------------------------
// Worker
// ---------------------------------------------------------------------------

pub struct Worker {
    consumers: Vec<(&'static str, Arc<dyn MessageHandler>)>,
    indexes: Arc<IndexDispatcher>,
    scheduler: Arc<IndexScheduler>,
    sweeper: Arc<MaintenanceSweeper>,
    scheduler_interval: Duration,
    maintenance_interval: Duration,
}

impl Worker {
    /// Build every handler and job. The scheduler's counter is registered on
    /// `registry`.
    pub async fn assemble(
        config: &WorkerConfig,
        data: Arc<dyn DataManager>,
        broker: &Broker,
        collaborators: Collaborators,
        registry: &Registry,
    ) -> Result<Self, ServiceError> {
        let webhook_requests = broker.publishers.provide(topics::WEBHOOK_EXECUTION_REQUESTS)?;
        let index_requests = broker.publishers.provide(topics::SEARCH_INDEX_REQUESTS)?;
        let outbound_emails = broker.publishers.provide(topics::OUTBOUND_EMAILS)?;

        let notifications = NotificationDispatcher::new(data.clone(), outbound_emails, config.environment.clone());
        let fanout = DataChangeFanout::new(
            data.clone(),
            collaborators.reporter,
            webhook_requests,
            index_requests.clone(),
            notifications,
        )
        .with_branch_timeout(config.branch_timeout);

        let indexes = Arc::new(IndexDispatcher::new(data.clone(), standard_indexers(&collaborators.search)));

        let consumers: Vec<(&'static str, Arc<dyn MessageHandler>)> = vec![
            (topics::DATA_CHANGES, Arc::new(fanout)),
            (topics::WEBHOOK_EXECUTION_REQUESTS, Arc::new(WebhookExecutor::new(data.clone()))),
            (topics::OUTBOUND_EMAILS, Arc::new(EmailDeliveryHandler::new(collaborators.emailer))),
            (topics::SEARCH_INDEX_REQUESTS, indexes.clone()),
            (
                topics::USER_DATA_AGGREGATION,
                Arc::new(UserDataAggregator::new(data.clone(), collaborators.store)),
            ),
        ];

        let scheduler =
            IndexScheduler::with_default_producers(data.clone(), index_requests, StdRng::from_os_rng(), registry)
                .await?;

        Ok(Self {
            consumers,
            indexes,
            scheduler: Arc::new(scheduler),
            sweeper: Arc::new(MaintenanceSweeper::new(data)),
            scheduler_interval: config.scheduler_interval,
            maintenance_interval: config.maintenance_interval,
        })
    }

    /// Topics this worker consumes.
    pub fn topics(&self) -> Vec<&'static str> {
        self.consumers.iter().map(|(topic, _)| *topic).collect()
    }

    /// Bind every consumer, start the periodic jobs, and wait until `cancel`
    /// fires and everything has drained.
    pub async fn run(self, broker: &Broker, cancel: CancellationToken) -> Result<(), ServiceError> {
        for &index_type in IndexType::ALL {
            if let Some(indexer) = self.indexes.indexer(index_type) {
                if let Err(e) = indexer.ensure_exists().await {
                    tracing::warn!(index_type = %index_type, error = %e, "Failed to ensure search index exists");
                }
            }
        }

        let (errors_tx, mut errors_rx) = mpsc::channel::<MessagingError>(ERROR_CHANNEL_CAPACITY);
        let mut tasks = JoinSet::new();

        for (topic, handler) in self.consumers {
            let consumer = broker.consumers.provide(topic, handler).await?;
            tasks.spawn(consumer.consume(cancel.clone(), errors_tx.clone()));
            tracing::info!(topic, "Consumer bound");
        }
        drop(errors_tx);

        let scheduler = self.scheduler.clone();
        let scheduler_cancel = cancel.clone();
        let scheduler_interval = self.scheduler_interval;
        tasks.spawn(async move { scheduler.run(scheduler_cancel, scheduler_interval).await });

        let sweeper = self.sweeper.clone();
        let sweeper_cancel = cancel.clone();
        let maintenance_interval = self.maintenance_interval;
        tasks.spawn(async move { sweeper.run(sweeper_cancel, maintenance_interval).await });

        // Drains until every consumer has dropped its sender.
        let error_logger = tokio::spawn(async move {
            while let Some(err) = errors_rx.recv().await {
                tracing::error!(error = %err, "Message handling failed");
            }
        });

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                tracing::error!(error = %e, "Worker task panicked");
            }
        }
        let _ = error_logger.await;

        tracing::info!("All consumers and jobs stopped");
        Ok(())
    }
}
