//! Text-search backends.
//!
//! [`Index`] is the contract the indexing pipeline writes through;
//! [`MemoryIndex`] and [`ElasticsearchIndex`] implement it, and
//! [`SearchConfig`] picks one from the environment.

pub mod config;
pub mod elasticsearch;
pub mod error;
pub mod index;
pub mod memory;

pub use config::{SearchBackend, SearchConfig};
pub use elasticsearch::ElasticsearchIndex;
pub use error::SearchError;
pub use index::{Document, Index};
pub use memory::MemoryIndex;
