//! Shared vocabulary of the Dinner Done Better event core: identifiers,
//! event and index types, webhook signing, and deployment environments.
//!
//! This crate has no internal dependencies so every other crate (and any
//! future API-side producer) can use it.

pub mod environment;
pub mod error;
pub mod event_types;
pub mod index_types;
pub mod signing;
pub mod types;

pub use environment::EnvironmentConfig;
pub use error::CoreError;
pub use event_types::{EventClass, EventType, USER_LIFECYCLE_EVENT_TYPES};
pub use index_types::IndexType;
