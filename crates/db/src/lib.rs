//! Datastore access for the event core.
//!
//! - [`DataManager`]: the read/mark contract the handlers depend on.
//! - [`PgDataManager`]: its PostgreSQL implementation, built on the
//!   [`repositories`] layer.
//! - [`models`]: row types, their search-subset projections, and the user
//!   data export shape.

use std::time::Duration;

use sqlx::postgres::PgPoolOptions;

pub mod data_manager;
pub mod error;
pub mod models;
pub mod postgres;
pub mod repositories;

pub use data_manager::DataManager;
pub use error::DbError;
pub use postgres::PgDataManager;

pub type DbPool = sqlx::PgPool;

/// Default pool size when `DATABASE_MAX_CONNECTIONS` is not set.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 20;

/// Create a connection pool from a database URL.
pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url)
        .await
}

/// Round-trip a trivial query to prove the pool is usable.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}
