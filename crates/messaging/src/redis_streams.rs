//! Redis Streams-backed broker (durable, at-least-once delivery).
//!
//! - **Topics**: one stream per topic name, body stored in the `payload` field.
//! - **Consumer groups**: every consumer of a topic joins the configured
//!   group, so messages are load-balanced across worker processes.
//! - **Acknowledgement**: `XACK` only after the handler succeeds. A failed
//!   entry stays pending in the group.
//! - **Redelivery**: each loop first reclaims entries that have been pending
//!   longer than the pending timeout, from any consumer in the group (so a
//!   crashed worker's entries are picked up too), then reads new entries.
//!   Once an entry has been delivered `max_redeliveries + 1` times it is
//!   logged and acknowledged without being handled again.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::streams::{StreamClaimReply, StreamId, StreamReadOptions, StreamReadReply};
use redis::AsyncCommands;
use tokio::sync::{mpsc, OnceCell};
use tokio_util::sync::CancellationToken;

use crate::consumer::{report, Consumer, ConsumerProvider, MessageHandler};
use crate::error::MessagingError;
use crate::memory::DEFAULT_MAX_REDELIVERIES;
use crate::publisher::{Publisher, PublisherProvider};

/// Stream field holding the JSON body.
const PAYLOAD_FIELD: &str = "payload";

/// How long a blocking `XREADGROUP` waits before looping.
const DEFAULT_BLOCK_MS: usize = 5000;

/// Messages fetched per read.
const DEFAULT_BATCH_SIZE: usize = 16;

/// Pending entries idle longer than this are reclaimed and redelivered.
pub const DEFAULT_PENDING_TIMEOUT: Duration = Duration::from_secs(60);

/// Pause after a failed read.
const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

#[derive(Clone)]
pub struct RedisStreamsBroker {
    client: Arc<redis::Client>,
    connection: Arc<OnceCell<MultiplexedConnection>>,
    group: String,
    consumer_name: String,
    max_redeliveries: u32,
    pending_timeout: Duration,
}

impl RedisStreamsBroker {
    /// Create a broker for `redis_url` whose consumers join `group`.
    ///
    /// Each broker instance gets a unique consumer name within the group.
    pub fn new(redis_url: &str, group: impl Into<String>) -> Result<Self, MessagingError> {
        let client = redis::Client::open(redis_url)?;
        Ok(Self {
            client: Arc::new(client),
            connection: Arc::new(OnceCell::new()),
            group: group.into(),
            consumer_name: format!("worker-{}", uuid::Uuid::new_v4()),
            max_redeliveries: DEFAULT_MAX_REDELIVERIES,
            pending_timeout: DEFAULT_PENDING_TIMEOUT,
        })
    }

    pub fn with_max_redeliveries(mut self, max_redeliveries: u32) -> Self {
        self.max_redeliveries = max_redeliveries;
        self
    }

    pub fn with_pending_timeout(mut self, pending_timeout: Duration) -> Self {
        self.pending_timeout = pending_timeout;
        self
    }

    async fn connection(&self) -> Result<MultiplexedConnection, MessagingError> {
        let conn = self
            .connection
            .get_or_try_init(|| async {
                self.client
                    .get_multiplexed_async_connection()
                    .await
                    .map_err(MessagingError::from)
            })
            .await?;
        Ok(conn.clone())
    }

    /// Create the consumer group if it does not exist yet (idempotent).
    async fn ensure_group(&self, topic: &str) -> Result<(), MessagingError> {
        let mut conn = self.connection().await?;
        let created: Result<(), redis::RedisError> =
            conn.xgroup_create_mkstream(topic, &self.group, "$").await;
        match created {
            Ok(()) => Ok(()),
            Err(e) if e.code() == Some("BUSYGROUP") => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

// ---------------------------------------------------------------------------
// Pending entries
// ---------------------------------------------------------------------------

/// One row of the `XPENDING` extended form: id, owner, idle ms, deliveries.
type PendingEntry = (String, String, u64, u64);

/// What to do with the stale part of a group's pending list.
#[derive(Debug, Default, PartialEq, Eq)]
struct PendingPlan {
    /// Ids to claim and hand to the handler again.
    retry: Vec<String>,
    /// Ids (with their delivery count) that have used up their redeliveries.
    exhausted: Vec<(String, u64)>,
}

/// Split pending entries idle for at least `min_idle_ms`. An entry that has
/// already been delivered `max_redeliveries + 1` times is exhausted.
fn plan_pending(entries: Vec<PendingEntry>, min_idle_ms: u64, max_redeliveries: u32) -> PendingPlan {
    let mut plan = PendingPlan::default();
    for (id, _owner, idle_ms, deliveries) in entries {
        if idle_ms < min_idle_ms {
            continue;
        }
        if deliveries > u64::from(max_redeliveries) {
            plan.exhausted.push((id, deliveries));
        } else {
            plan.retry.push(id);
        }
    }
    plan
}

impl PublisherProvider for RedisStreamsBroker {
    fn provide(&self, topic: &str) -> Result<Arc<dyn Publisher>, MessagingError> {
        Ok(Arc::new(RedisPublisher {
            broker: self.clone(),
            topic: topic.to_string(),
        }))
    }
}

#[async_trait]
impl ConsumerProvider for RedisStreamsBroker {
    async fn provide(
        &self,
        topic: &str,
        handler: Arc<dyn MessageHandler>,
    ) -> Result<Box<dyn Consumer>, MessagingError> {
        self.ensure_group(topic).await?;
        Ok(Box::new(RedisConsumer {
            broker: self.clone(),
            topic: topic.to_string(),
            handler,
        }))
    }
}

// ---------------------------------------------------------------------------
// Publisher
// ---------------------------------------------------------------------------

struct RedisPublisher {
    broker: RedisStreamsBroker,
    topic: String,
}

#[async_trait]
impl Publisher for RedisPublisher {
    fn topic(&self) -> &str {
        &self.topic
    }

    async fn publish_bytes(&self, payload: Vec<u8>) -> Result<(), MessagingError> {
        let mut conn = self.broker.connection().await?;
        let _: String = conn
            .xadd(&self.topic, "*", &[(PAYLOAD_FIELD, payload.as_slice())])
            .await?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Consumer
// ---------------------------------------------------------------------------

struct RedisConsumer {
    broker: RedisStreamsBroker,
    topic: String,
    handler: Arc<dyn MessageHandler>,
}

impl RedisConsumer {
    /// Read up to one batch of entries never delivered to this group.
    async fn read_new(&self) -> Result<Vec<StreamId>, MessagingError> {
        let mut conn = self.broker.connection().await?;
        let opts = StreamReadOptions::default()
            .group(&self.broker.group, &self.broker.consumer_name)
            .count(DEFAULT_BATCH_SIZE)
            .block(DEFAULT_BLOCK_MS);
        let reply: StreamReadReply = conn.xread_options(&[&self.topic], &[">"], &opts).await?;
        Ok(reply.keys.into_iter().flat_map(|key| key.ids).collect())
    }

    /// Take over stale pending entries from any consumer in the group and
    /// drop the ones that have exhausted their redeliveries.
    async fn reclaim(&self) -> Result<Vec<StreamId>, MessagingError> {
        let mut conn = self.broker.connection().await?;
        let pending: Vec<PendingEntry> = redis::cmd("XPENDING")
            .arg(&self.topic)
            .arg(&self.broker.group)
            .arg("-")
            .arg("+")
            .arg(DEFAULT_BATCH_SIZE)
            .query_async(&mut conn)
            .await?;

        let min_idle_ms = self.broker.pending_timeout.as_millis() as u64;
        let plan = plan_pending(pending, min_idle_ms, self.broker.max_redeliveries);

        for (id, deliveries) in &plan.exhausted {
            tracing::error!(topic = %self.topic, id = %id, deliveries, "Message exhausted redeliveries, dropping");
            if let Err(e) = self.ack(id).await {
                tracing::error!(topic = %self.topic, id = %id, error = %e, "XACK failed");
            }
        }
        if plan.retry.is_empty() {
            return Ok(Vec::new());
        }

        // XCLAIM re-checks the idle time, so two workers cannot both claim an entry.
        let claimed: StreamClaimReply = conn
            .xclaim(
                &self.topic,
                &self.broker.group,
                &self.broker.consumer_name,
                min_idle_ms,
                plan.retry.as_slice(),
            )
            .await?;
        if !claimed.ids.is_empty() {
            tracing::info!(topic = %self.topic, count = claimed.ids.len(), "Reclaimed pending messages");
        }
        Ok(claimed.ids)
    }

    /// Handle entries in order. Successes are acknowledged; failures stay
    /// pending until they are reclaimed.
    async fn process(&self, entries: Vec<StreamId>, errors: &mpsc::Sender<MessagingError>) {
        for entry in entries {
            let payload: Vec<u8> = entry.get(PAYLOAD_FIELD).unwrap_or_default();
            match self.handler.handle(&payload).await {
                Ok(()) => {
                    if let Err(e) = self.ack(&entry.id).await {
                        tracing::error!(topic = %self.topic, id = %entry.id, error = %e, "XACK failed");
                    }
                }
                Err(e) => report(errors, &self.topic, e),
            }
        }
    }

    async fn ack(&self, id: &str) -> Result<(), MessagingError> {
        let mut conn = self.broker.connection().await?;
        let _: i64 = conn.xack(&self.topic, &self.broker.group, &[id]).await?;
        Ok(())
    }

    async fn pause(&self, stop: &CancellationToken) {
        tokio::select! {
            _ = stop.cancelled() => {}
            _ = tokio::time::sleep(DEFAULT_RETRY_DELAY) => {}
        }
    }
}

#[async_trait]
impl Consumer for RedisConsumer {
    async fn consume(self: Box<Self>, stop: CancellationToken, errors: mpsc::Sender<MessagingError>) {
        tracing::info!(
            topic = %self.topic,
            group = %self.broker.group,
            consumer = %self.broker.consumer_name,
            "Redis consumer started"
        );

        while !stop.is_cancelled() {
            match self.reclaim().await {
                Ok(entries) => self.process(entries, &errors).await,
                Err(e) => tracing::error!(topic = %self.topic, error = %e, "Failed to reclaim pending messages"),
            }
            if stop.is_cancelled() {
                break;
            }

            let read = tokio::select! {
                biased;
                _ = stop.cancelled() => break,
                read = self.read_new() => read,
            };
            match read {
                Ok(entries) => self.process(entries, &errors).await,
                Err(e) => {
                    tracing::error!(topic = %self.topic, error = %e, "Redis read failed");
                    self.pause(&stop).await;
                }
            }
        }

        tracing::info!(topic = %self.topic, "Redis consumer stopped");
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str, idle_ms: u64, deliveries: u64) -> PendingEntry {
        (id.to_string(), "worker-a".to_string(), idle_ms, deliveries)
    }

    #[test]
    fn fresh_pending_entries_are_left_alone() {
        let plan = plan_pending(vec![entry("1-0", 10, 1)], 1000, 3);
        assert_eq!(plan, PendingPlan::default());
    }

    #[test]
    fn stale_entries_are_retried_until_the_cap() {
        let plan = plan_pending(
            vec![entry("1-0", 5000, 1), entry("2-0", 5000, 3), entry("3-0", 5000, 4)],
            1000,
            3,
        );
        assert_eq!(plan.retry, vec!["1-0".to_string(), "2-0".to_string()]);
        assert_eq!(plan.exhausted, vec![("3-0".to_string(), 4)]);
    }

    #[test]
    fn zero_redeliveries_drops_after_the_first_attempt() {
        let plan = plan_pending(vec![entry("1-0", 5000, 1)], 0, 0);
        assert!(plan.retry.is_empty());
        assert_eq!(plan.exhausted, vec![("1-0".to_string(), 1)]);
    }
}
