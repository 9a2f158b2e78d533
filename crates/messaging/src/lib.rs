//! Topic-based publish/consume plane.
//!
//! Publishers are bound to a topic and enqueue JSON bodies. Consumers bind a
//! [`MessageHandler`] to a topic and run until cancelled. Two brokers are
//! provided: [`MemoryBroker`] for single-process deployments and tests, and
//! `RedisStreamsBroker` (feature `redis`) for durable delivery.

pub mod config;
pub mod consumer;
pub mod error;
pub mod memory;
pub mod publisher;
#[cfg(feature = "redis")]
pub mod redis_streams;
pub mod topics;

pub use config::{Broker, BrokerConfig};
pub use consumer::{decode, Consumer, ConsumerProvider, MessageHandler};
pub use error::{HandlerError, MessagingError};
pub use memory::MemoryBroker;
pub use publisher::{Publisher, PublisherProvider};
#[cfg(feature = "redis")]
pub use redis_streams::RedisStreamsBroker;
