//! Bookkeeping of the `last_indexed_at` column shared by every searchable
//! table.
//!
//! Each [`IndexType`] is backed by a table of the same name, so the queries
//! here are built from the index name rather than repeated per entity.

use ddb_core::IndexType;
use sqlx::PgPool;

/// Upper bound on a single "needs indexing" cohort.
pub const INDEXING_COHORT_LIMIT: i64 = 1000;

pub struct SearchIndexRepo;

impl SearchIndexRepo {
    /// IDs of live rows never indexed, or modified since their last indexing.
    pub async fn ids_needing_indexing(
        pool: &PgPool,
        index_type: IndexType,
    ) -> Result<Vec<String>, sqlx::Error> {
        let table = index_type.as_str();
        let query = format!(
            "SELECT id FROM {table} \
             WHERE archived_at IS NULL \
               AND (last_indexed_at IS NULL \
                    OR last_indexed_at < COALESCE(last_updated_at, created_at)) \
             ORDER BY id \
             LIMIT $1"
        );
        sqlx::query_scalar::<_, String>(&query)
            .bind(INDEXING_COHORT_LIMIT)
            .fetch_all(pool)
            .await
    }

    /// One page of live row IDs in stable order, for full (re)indexing.
    pub async fn ids_page(
        pool: &PgPool,
        index_type: IndexType,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<String>, sqlx::Error> {
        let table = index_type.as_str();
        let query = format!(
            "SELECT id FROM {table} WHERE archived_at IS NULL ORDER BY id LIMIT $1 OFFSET $2"
        );
        sqlx::query_scalar::<_, String>(&query)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Stamp `last_indexed_at = NOW()`. Returns `false` if no row matched.
    pub async fn mark_indexed(
        pool: &PgPool,
        index_type: IndexType,
        id: &str,
    ) -> Result<bool, sqlx::Error> {
        let table = index_type.as_str();
        let query = format!("UPDATE {table} SET last_indexed_at = NOW() WHERE id = $1");
        let result = sqlx::query(&query).bind(id).execute(pool).await?;
        Ok(result.rows_affected() > 0)
    }
}
