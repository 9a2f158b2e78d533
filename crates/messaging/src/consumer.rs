//! Consumer side of the plane.

use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::{HandlerError, MessagingError};

/// Processes one raw message body.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle(&self, payload: &[u8]) -> Result<(), HandlerError>;
}

/// A running subscription of one handler to one topic.
#[async_trait]
pub trait Consumer: Send {
    /// Deliver messages to the handler until `stop` is cancelled.
    ///
    /// Handler failures are reported on `errors` and never end the loop.
    /// When `stop` fires, the in-flight message (if any) is finished before
    /// this returns.
    async fn consume(self: Box<Self>, stop: CancellationToken, errors: mpsc::Sender<MessagingError>);
}

/// Binds handlers to topics.
#[async_trait]
pub trait ConsumerProvider: Send + Sync {
    async fn provide(
        &self,
        topic: &str,
        handler: Arc<dyn MessageHandler>,
    ) -> Result<Box<dyn Consumer>, MessagingError>;
}

/// Decode a JSON message body.
pub fn decode<T: DeserializeOwned>(payload: &[u8]) -> Result<T, serde_json::Error> {
    serde_json::from_slice(payload)
}

/// Report a handler failure without blocking consumption on a full or
/// closed error channel.
pub(crate) fn report(errors: &mpsc::Sender<MessagingError>, topic: &str, source: HandlerError) {
    tracing::warn!(topic, error = %source, "Message handler failed");
    let err = MessagingError::Handler {
        topic: topic.to_string(),
        source,
    };
    if let Err(mpsc::error::TrySendError::Full(err)) = errors.try_send(err) {
        tracing::error!(topic, error = %err, "Error channel full, dropping handler error");
    }
}
