//! PostgreSQL implementation of [`DataManager`].

use async_trait::async_trait;
use chrono::Utc;
use ddb_core::{EventType, IndexType};

use crate::data_manager::DataManager;
use crate::error::DbError;
use crate::models::{
    Household, Meal, Recipe, User, UserDataCollection, ValidIngredient, ValidIngredientState,
    ValidInstrument, ValidMeasurementUnit, ValidPreparation, ValidVessel, Webhook,
};
use crate::repositories::{
    HouseholdRepo, MealPlanRepo, MealRepo, OAuth2TokenRepo, RecipeRepo, ReferenceRepo,
    SearchIndexRepo, UserRepo, WebhookRepo,
};
use crate::DbPool;

/// [`DataManager`] backed by the repository layer.
#[derive(Debug, Clone)]
pub struct PgDataManager {
    pool: DbPool,
}

impl PgDataManager {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

/// Turn an optional row into `NotFound` when absent.
fn found<T>(row: Option<T>, entity: &'static str, id: &str) -> Result<T, DbError> {
    row.ok_or_else(|| DbError::not_found(entity, id))
}

#[async_trait]
impl DataManager for PgDataManager {
    async fn get_webhooks_for_household_and_event(
        &self,
        household_id: &str,
        event_type: EventType,
    ) -> Result<Vec<Webhook>, DbError> {
        Ok(WebhookRepo::list_for_household_and_event(&self.pool, household_id, event_type).await?)
    }

    async fn get_webhook(&self, webhook_id: &str, household_id: &str) -> Result<Webhook, DbError> {
        let row = WebhookRepo::find_by_id(&self.pool, webhook_id, household_id).await?;
        found(row, "webhook", webhook_id)
    }

    async fn get_household(&self, household_id: &str) -> Result<Household, DbError> {
        let row = HouseholdRepo::find_by_id(&self.pool, household_id).await?;
        found(row, "household", household_id)
    }

    async fn get_user(&self, user_id: &str) -> Result<User, DbError> {
        let row = UserRepo::find_by_id(&self.pool, user_id).await?;
        found(row, "user", user_id)
    }

    async fn get_household_members(&self, household_id: &str) -> Result<Vec<User>, DbError> {
        Ok(UserRepo::list_household_members(&self.pool, household_id).await?)
    }

    async fn get_recipe(&self, id: &str) -> Result<Recipe, DbError> {
        found(RecipeRepo::find_by_id(&self.pool, id).await?, "recipe", id)
    }

    async fn get_meal(&self, id: &str) -> Result<Meal, DbError> {
        found(MealRepo::find_by_id(&self.pool, id).await?, "meal", id)
    }

    async fn get_valid_ingredient(&self, id: &str) -> Result<ValidIngredient, DbError> {
        let row = ReferenceRepo::find_valid_ingredient(&self.pool, id).await?;
        found(row, "valid_ingredient", id)
    }

    async fn get_valid_instrument(&self, id: &str) -> Result<ValidInstrument, DbError> {
        let row = ReferenceRepo::find_valid_instrument(&self.pool, id).await?;
        found(row, "valid_instrument", id)
    }

    async fn get_valid_measurement_unit(&self, id: &str) -> Result<ValidMeasurementUnit, DbError> {
        let row = ReferenceRepo::find_valid_measurement_unit(&self.pool, id).await?;
        found(row, "valid_measurement_unit", id)
    }

    async fn get_valid_preparation(&self, id: &str) -> Result<ValidPreparation, DbError> {
        let row = ReferenceRepo::find_valid_preparation(&self.pool, id).await?;
        found(row, "valid_preparation", id)
    }

    async fn get_valid_ingredient_state(&self, id: &str) -> Result<ValidIngredientState, DbError> {
        let row = ReferenceRepo::find_valid_ingredient_state(&self.pool, id).await?;
        found(row, "valid_ingredient_state", id)
    }

    async fn get_valid_vessel(&self, id: &str) -> Result<ValidVessel, DbError> {
        let row = ReferenceRepo::find_valid_vessel(&self.pool, id).await?;
        found(row, "valid_vessel", id)
    }

    async fn get_ids_needing_indexing(&self, index_type: IndexType) -> Result<Vec<String>, DbError> {
        Ok(SearchIndexRepo::ids_needing_indexing(&self.pool, index_type).await?)
    }

    async fn get_ids_for_index(
        &self,
        index_type: IndexType,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<String>, DbError> {
        Ok(SearchIndexRepo::ids_page(&self.pool, index_type, offset, limit).await?)
    }

    async fn mark_as_indexed(&self, index_type: IndexType, id: &str) -> Result<(), DbError> {
        if SearchIndexRepo::mark_indexed(&self.pool, index_type, id).await? {
            Ok(())
        } else {
            Err(DbError::not_found(index_type.as_str(), id))
        }
    }

    async fn delete_expired_oauth2_client_tokens(&self) -> Result<u64, DbError> {
        Ok(OAuth2TokenRepo::delete_expired(&self.pool).await?)
    }

    async fn aggregate_user_data(&self, user_id: &str) -> Result<UserDataCollection, DbError> {
        let user = self.get_user(user_id).await?;
        let households = HouseholdRepo::list_for_user(&self.pool, user_id).await?;
        let household_ids: Vec<String> = households.iter().map(|h| h.id.clone()).collect();

        let recipes = RecipeRepo::list_created_by(&self.pool, user_id).await?;
        let meals = MealRepo::list_created_by(&self.pool, user_id).await?;
        let meal_plans = MealPlanRepo::list_for_households(&self.pool, &household_ids).await?;
        let webhooks = WebhookRepo::list_for_households(&self.pool, &household_ids).await?;

        tracing::debug!(
            user_id,
            households = households.len(),
            recipes = recipes.len(),
            meals = meals.len(),
            "Aggregated user data"
        );

        Ok(UserDataCollection {
            user,
            households,
            recipes,
            meals,
            meal_plans,
            webhooks,
            generated_at: Utc::now(),
        })
    }
}
