//! The datastore contract consumed by the event core.
//!
//! Handlers depend on `Arc<dyn DataManager>` so they can run against
//! [`PgDataManager`](crate::PgDataManager) in production and against
//! in-memory fakes in tests.

use async_trait::async_trait;
use ddb_core::{EventType, IndexType};

use crate::error::DbError;
use crate::models::{
    Household, Meal, Recipe, User, UserDataCollection, ValidIngredient, ValidIngredientState,
    ValidInstrument, ValidMeasurementUnit, ValidPreparation, ValidVessel, Webhook,
};

#[async_trait]
pub trait DataManager: Send + Sync {
    // -- webhooks and tenancy ------------------------------------------------

    /// Non-archived webhooks of `household_id` subscribed to `event_type`,
    /// in creation order.
    async fn get_webhooks_for_household_and_event(
        &self,
        household_id: &str,
        event_type: EventType,
    ) -> Result<Vec<Webhook>, DbError>;

    async fn get_webhook(&self, webhook_id: &str, household_id: &str) -> Result<Webhook, DbError>;

    async fn get_household(&self, household_id: &str) -> Result<Household, DbError>;

    async fn get_user(&self, user_id: &str) -> Result<User, DbError>;

    async fn get_household_members(&self, household_id: &str) -> Result<Vec<User>, DbError>;

    // -- searchable entities -------------------------------------------------

    async fn get_recipe(&self, id: &str) -> Result<Recipe, DbError>;

    async fn get_meal(&self, id: &str) -> Result<Meal, DbError>;

    async fn get_valid_ingredient(&self, id: &str) -> Result<ValidIngredient, DbError>;

    async fn get_valid_instrument(&self, id: &str) -> Result<ValidInstrument, DbError>;

    async fn get_valid_measurement_unit(&self, id: &str) -> Result<ValidMeasurementUnit, DbError>;

    async fn get_valid_preparation(&self, id: &str) -> Result<ValidPreparation, DbError>;

    async fn get_valid_ingredient_state(&self, id: &str) -> Result<ValidIngredientState, DbError>;

    async fn get_valid_vessel(&self, id: &str) -> Result<ValidVessel, DbError>;

    // -- search bookkeeping --------------------------------------------------

    /// A bounded cohort of IDs whose `last_indexed_at` is null or older than
    /// their last update.
    async fn get_ids_needing_indexing(&self, index_type: IndexType) -> Result<Vec<String>, DbError>;

    /// A page of live IDs for full index builds. An empty page ends paging.
    async fn get_ids_for_index(
        &self,
        index_type: IndexType,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<String>, DbError>;

    /// Set `last_indexed_at` to now.
    async fn mark_as_indexed(&self, index_type: IndexType, id: &str) -> Result<(), DbError>;

    // -- maintenance and exports ---------------------------------------------

    /// Purge OAuth2 client tokens whose every expiry precedes `NOW() - 1 day`.
    async fn delete_expired_oauth2_client_tokens(&self) -> Result<u64, DbError>;

    async fn aggregate_user_data(&self, user_id: &str) -> Result<UserDataCollection, DbError>;
}
