//! Repository for the `webhooks` and `webhook_trigger_events` tables.

use ddb_core::EventType;
use sqlx::PgPool;

use crate::models::Webhook;

const WEBHOOK_COLUMNS: &str = "\
    id, name, household_id, url, method, content_type, \
    created_at, last_updated_at, archived_at";

/// Read access to tenant webhooks.
pub struct WebhookRepo;

impl WebhookRepo {
    /// Find a webhook by ID, scoped to its owning household.
    ///
    /// Archived webhooks are not returned.
    pub async fn find_by_id(
        pool: &PgPool,
        id: &str,
        household_id: &str,
    ) -> Result<Option<Webhook>, sqlx::Error> {
        let query = format!(
            "SELECT {WEBHOOK_COLUMNS} FROM webhooks \
             WHERE id = $1 AND household_id = $2 AND archived_at IS NULL"
        );
        sqlx::query_as::<_, Webhook>(&query)
            .bind(id)
            .bind(household_id)
            .fetch_optional(pool)
            .await
    }

    /// List the non-archived webhooks of a household that subscribe to an
    /// event type, oldest first.
    pub async fn list_for_household_and_event(
        pool: &PgPool,
        household_id: &str,
        event_type: EventType,
    ) -> Result<Vec<Webhook>, sqlx::Error> {
        let query = format!(
            "SELECT {WEBHOOK_COLUMNS} FROM webhooks \
             WHERE household_id = $1 \
               AND archived_at IS NULL \
               AND id IN ( \
                   SELECT belongs_to_webhook FROM webhook_trigger_events \
                   WHERE trigger_event = $2 AND archived_at IS NULL \
               ) \
             ORDER BY created_at, id"
        );
        sqlx::query_as::<_, Webhook>(&query)
            .bind(household_id)
            .bind(event_type.as_str())
            .fetch_all(pool)
            .await
    }

    /// List all non-archived webhooks owned by any of the given households.
    pub async fn list_for_households(
        pool: &PgPool,
        household_ids: &[String],
    ) -> Result<Vec<Webhook>, sqlx::Error> {
        let query = format!(
            "SELECT {WEBHOOK_COLUMNS} FROM webhooks \
             WHERE household_id = ANY($1) AND archived_at IS NULL \
             ORDER BY created_at, id"
        );
        sqlx::query_as::<_, Webhook>(&query)
            .bind(household_ids)
            .fetch_all(pool)
            .await
    }
}
