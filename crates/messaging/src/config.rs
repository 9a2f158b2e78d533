//! Broker selection from the environment.
//!
//! | Env var                  | Default            |
//! |--------------------------|--------------------|
//! | `MESSAGE_QUEUE_PROVIDER` | `memory`           |
//! | `REDIS_URL`              | (required for redis) |
//! | `REDIS_CONSUMER_GROUP`   | `ddb-workers`      |

use std::sync::Arc;

use crate::consumer::ConsumerProvider;
use crate::error::MessagingError;
use crate::memory::MemoryBroker;
use crate::publisher::PublisherProvider;

/// Default consumer group for Redis Streams.
pub const DEFAULT_CONSUMER_GROUP: &str = "ddb-workers";

/// Which broker backs the plane.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrokerConfig {
    Memory,
    Redis { url: String, consumer_group: String },
}

/// A broker handed out as both halves of the plane.
pub struct Broker {
    pub publishers: Arc<dyn PublisherProvider>,
    pub consumers: Arc<dyn ConsumerProvider>,
}

impl BrokerConfig {
    /// Read the broker configuration from environment variables.
    pub fn from_env() -> Result<Self, MessagingError> {
        let provider = std::env::var("MESSAGE_QUEUE_PROVIDER").unwrap_or_else(|_| "memory".into());
        Self::parse(
            &provider,
            std::env::var("REDIS_URL").ok(),
            std::env::var("REDIS_CONSUMER_GROUP").ok(),
        )
    }

    fn parse(
        provider: &str,
        redis_url: Option<String>,
        consumer_group: Option<String>,
    ) -> Result<Self, MessagingError> {
        match provider.trim().to_ascii_lowercase().as_str() {
            "" | "memory" => Ok(Self::Memory),
            "redis" => {
                let url = redis_url
                    .filter(|u| !u.trim().is_empty())
                    .ok_or_else(|| MessagingError::Config("REDIS_URL is required for the redis provider".into()))?;
                Ok(Self::Redis {
                    url,
                    consumer_group: consumer_group.unwrap_or_else(|| DEFAULT_CONSUMER_GROUP.into()),
                })
            }
            other => Err(MessagingError::Config(format!("unknown message queue provider: {other}"))),
        }
    }

    /// Construct the configured broker.
    pub fn build(&self) -> Result<Broker, MessagingError> {
        match self {
            Self::Memory => {
                let broker = Arc::new(MemoryBroker::default());
                Ok(Broker {
                    publishers: broker.clone(),
                    consumers: broker,
                })
            }
            #[cfg(feature = "redis")]
            Self::Redis { url, consumer_group } => {
                let broker = Arc::new(crate::redis_streams::RedisStreamsBroker::new(url, consumer_group.clone())?);
                Ok(Broker {
                    publishers: broker.clone(),
                    consumers: broker,
                })
            }
            #[cfg(not(feature = "redis"))]
            Self::Redis { .. } => Err(MessagingError::Config(
                "redis provider requested but the `redis` feature is disabled".into(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn memory_is_the_default() {
        assert_eq!(BrokerConfig::parse("", None, None).unwrap(), BrokerConfig::Memory);
        assert_eq!(BrokerConfig::parse("Memory", None, None).unwrap(), BrokerConfig::Memory);
    }

    #[test]
    fn redis_requires_url() {
        assert_matches!(BrokerConfig::parse("redis", None, None), Err(MessagingError::Config(_)));
        assert_matches!(
            BrokerConfig::parse("redis", Some("redis://localhost".into()), None),
            Ok(BrokerConfig::Redis { consumer_group, .. }) if consumer_group == DEFAULT_CONSUMER_GROUP
        );
    }

    #[test]
    fn unknown_provider_is_rejected() {
        assert_matches!(BrokerConfig::parse("kafka", None, None), Err(MessagingError::Config(_)));
    }
}
