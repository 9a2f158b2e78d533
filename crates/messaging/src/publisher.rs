//! Producer side of the plane.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::MessagingError;

/// A handle bound to one topic.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// The topic this publisher writes to.
    fn topic(&self) -> &str;

    /// Enqueue an already-encoded body.
    ///
    /// May wait when the broker applies back-pressure.
    async fn publish_bytes(&self, payload: Vec<u8>) -> Result<(), MessagingError>;
}

impl<'a> dyn Publisher + 'a {
    /// Encode `value` as JSON and enqueue it.
    pub async fn publish<T: Serialize + Sync + ?Sized>(&self, value: &T) -> Result<(), MessagingError> {
        let payload = serde_json::to_vec(value).map_err(|source| MessagingError::Encode {
            topic: self.topic().to_string(),
            source,
        })?;
        self.publish_bytes(payload).await
    }
}

/// Hands out publishers by topic name.
pub trait PublisherProvider: Send + Sync {
    fn provide(&self, topic: &str) -> Result<Arc<dyn Publisher>, MessagingError>;
}
