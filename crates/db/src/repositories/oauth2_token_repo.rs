//! Repository for the `oauth2_client_tokens` table.

use sqlx::PgPool;

pub struct OAuth2TokenRepo;

impl OAuth2TokenRepo {
    /// Delete tokens whose code, access, and refresh expiries all lie more
    /// than a day in the past. Returns the number of rows removed.
    pub async fn delete_expired(pool: &PgPool) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM oauth2_client_tokens \
             WHERE code_expires_at < (NOW() - INTERVAL '1 day') \
               AND access_expires_at < (NOW() - INTERVAL '1 day') \
               AND refresh_expires_at < (NOW() - INTERVAL '1 day')",
        )
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }
}
