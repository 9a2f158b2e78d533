//! In-process broker backed by bounded `tokio::sync::mpsc` channels.
//!
//! [`MemoryBroker`] implements both [`PublisherProvider`] and
//! [`ConsumerProvider`]. Each topic is one bounded channel, so publishers
//! wait when consumers fall behind. Consumers of the same topic compete for
//! messages. A message whose handler fails is re-enqueued until it has been
//! attempted `max_redeliveries + 1` times, then dropped with an error log.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::consumer::{report, Consumer, ConsumerProvider, MessageHandler};
use crate::error::MessagingError;
use crate::publisher::{Publisher, PublisherProvider};

/// Default per-topic buffer size.
pub const DEFAULT_CAPACITY: usize = 1024;

/// Default number of redeliveries after the first failed attempt.
pub const DEFAULT_MAX_REDELIVERIES: u32 = 3;

#[derive(Debug)]
struct Delivery {
    payload: Vec<u8>,
    attempt: u32,
}

struct Topic {
    name: String,
    sender: mpsc::Sender<Delivery>,
    receiver: tokio::sync::Mutex<mpsc::Receiver<Delivery>>,
}

// ---------------------------------------------------------------------------
// MemoryBroker
// ---------------------------------------------------------------------------

/// Shared in-process broker. Wrap in an `Arc` and hand it out as both a
/// publisher and a consumer provider.
pub struct MemoryBroker {
    topics: Mutex<HashMap<String, Arc<Topic>>>,
    capacity: usize,
    max_redeliveries: u32,
}

impl MemoryBroker {
    pub fn new(capacity: usize, max_redeliveries: u32) -> Self {
        Self {
            topics: Mutex::new(HashMap::new()),
            capacity: capacity.max(1),
            max_redeliveries,
        }
    }

    fn topic(&self, name: &str) -> Arc<Topic> {
        let mut topics = self.topics.lock().unwrap_or_else(|e| e.into_inner());
        Arc::clone(topics.entry(name.to_string()).or_insert_with(|| {
            let (sender, receiver) = mpsc::channel(self.capacity);
            Arc::new(Topic {
                name: name.to_string(),
                sender,
                receiver: tokio::sync::Mutex::new(receiver),
            })
        }))
    }

    /// Number of messages waiting on a topic.
    pub fn pending(&self, name: &str) -> usize {
        let topic = self.topic(name);
        self.capacity - topic.sender.capacity()
    }
}

impl Default for MemoryBroker {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY, DEFAULT_MAX_REDELIVERIES)
    }
}

impl PublisherProvider for MemoryBroker {
    fn provide(&self, topic: &str) -> Result<Arc<dyn Publisher>, MessagingError> {
        Ok(Arc::new(MemoryPublisher {
            topic: self.topic(topic),
        }))
    }
}

#[async_trait]
impl ConsumerProvider for MemoryBroker {
    async fn provide(
        &self,
        topic: &str,
        handler: Arc<dyn MessageHandler>,
    ) -> Result<Box<dyn Consumer>, MessagingError> {
        Ok(Box::new(MemoryConsumer {
            topic: self.topic(topic),
            handler,
            max_redeliveries: self.max_redeliveries,
        }))
    }
}

// ---------------------------------------------------------------------------
// Publisher / Consumer
// ---------------------------------------------------------------------------

struct MemoryPublisher {
    topic: Arc<Topic>,
}

#[async_trait]
impl Publisher for MemoryPublisher {
    fn topic(&self) -> &str {
        &self.topic.name
    }

    async fn publish_bytes(&self, payload: Vec<u8>) -> Result<(), MessagingError> {
        self.topic
            .sender
            .send(Delivery {
                payload,
                attempt: 0,
            })
            .await
            .map_err(|_| MessagingError::Closed(self.topic.name.clone()))
    }
}

struct MemoryConsumer {
    topic: Arc<Topic>,
    handler: Arc<dyn MessageHandler>,
    max_redeliveries: u32,
}

impl MemoryConsumer {
    async fn next(&self) -> Option<Delivery> {
        self.topic.receiver.lock().await.recv().await
    }

    fn redeliver(&self, delivery: Delivery) {
        if delivery.attempt >= self.max_redeliveries {
            tracing::error!(
                topic = %self.topic.name,
                attempts = delivery.attempt + 1,
                "Message exhausted redeliveries, dropping"
            );
            return;
        }
        let sender = self.topic.sender.clone();
        let retry = Delivery {
            payload: delivery.payload,
            attempt: delivery.attempt + 1,
        };
        // Re-enqueue off the consumer task so a full channel cannot block it.
        tokio::spawn(async move {
            let _ = sender.send(retry).await;
        });
    }
}

#[async_trait]
impl Consumer for MemoryConsumer {
    async fn consume(self: Box<Self>, stop: CancellationToken, errors: mpsc::Sender<MessagingError>) {
        tracing::info!(topic = %self.topic.name, "Consumer started");

        loop {
            let delivery = tokio::select! {
                biased;
                _ = stop.cancelled() => break,
                delivery = self.next() => delivery,
            };
            let Some(delivery) = delivery else {
                break;
            };

            if let Err(e) = self.handler.handle(&delivery.payload).await {
                report(&errors, &self.topic.name, e);
                self.redeliver(delivery);
            }
        }

        tracing::info!(topic = %self.topic.name, "Consumer stopped");
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
