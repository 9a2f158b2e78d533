/// Error returned by a [`MessageHandler`](crate::MessageHandler).
///
/// Handlers return an error only when redelivering the same bytes could
/// make progress; the broker decides whether and when to redeliver.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Error type for the publish/consume plane.
#[derive(Debug, thiserror::Error)]
pub enum MessagingError {
    /// The value could not be encoded as JSON.
    #[error("Failed to encode message for {topic}: {source}")]
    Encode {
        topic: String,
        #[source]
        source: serde_json::Error,
    },

    /// The topic's channel is gone (broker shut down).
    #[error("Topic {0} is closed")]
    Closed(String),

    /// A handler rejected a message. Consumption continues.
    #[error("Handler for {topic} failed: {source}")]
    Handler {
        topic: String,
        #[source]
        source: HandlerError,
    },

    /// Broker connection or command failure.
    #[error("Broker error: {0}")]
    Broker(String),

    #[error("Invalid broker configuration: {0}")]
    Config(String),
}

#[cfg(feature = "redis")]
impl From<redis::RedisError> for MessagingError {
    fn from(err: redis::RedisError) -> Self {
        MessagingError::Broker(err.to_string())
    }
}
