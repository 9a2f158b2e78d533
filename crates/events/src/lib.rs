//! Asynchronous event processing for Dinner Done Better.
//!
//! Every data change published by the API lands on the `data_changes` topic
//! as a [`DataChangeMessage`]. [`DataChangeFanout`] turns each one into
//! webhook execution requests, outbound emails, and search index requests,
//! which the remaining handlers deliver:
//!
//! - [`WebhookExecutor`] signs and sends tenant webhooks.
//! - [`EmailDeliveryHandler`] hands emails to an [`Emailer`].
//! - [`IndexDispatcher`] keeps the search indexes current.
//! - [`UserDataAggregator`] writes user data exports to an [`ObjectStore`].
//!
//! Alongside the consumers run the [`IndexScheduler`] (periodic re-indexing
//! of stale rows) and the [`MaintenanceSweeper`]. [`SearchIndexInitializer`]
//! rebuilds indexes from scratch.

pub mod aggregation;
pub mod analytics;
pub mod delivery;
pub mod emails;
pub mod fanout;
pub mod indexing;
pub mod initializer;
pub mod maintenance;
pub mod messages;
pub mod notifications;
pub mod scheduler;
pub mod storage;

pub use aggregation::{AggregationError, UserDataAggregator};
pub use analytics::{EventReporter, NoopEventReporter, SegmentEventReporter};
pub use delivery::email::{EmailDeliveryHandler, Emailer, NoopEmailer, SmtpEmailer};
pub use delivery::webhook::{WebhookExecutor, WebhookOutcome};
pub use emails::EmailRenderer;
pub use fanout::{DataChangeFanout, FanoutSummary};
pub use indexing::{standard_indexers, IndexDispatcher, IndexOutcome, RowIndexer};
pub use initializer::{InitializationReport, SearchIndexInitializer};
pub use maintenance::MaintenanceSweeper;
pub use messages::{
    DataChangeMessage, IndexRequest, OutboundEmailMessage, UserDataAggregationRequest, WebhookExecutionRequest,
};
pub use notifications::NotificationDispatcher;
pub use scheduler::{IndexScheduler, TickReport};
pub use storage::{FilesystemStore, ObjectStore, S3Store};
