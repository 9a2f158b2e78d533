//! Repository for the `recipes`, `meals`, and `meal_plans` tables.

use sqlx::PgPool;

use crate::models::{Meal, MealPlan, Recipe};

const RECIPE_COLUMNS: &str = "\
    id, name, slug, description, source, min_estimated_portions, \
    max_estimated_portions, portion_name, plural_portion_name, \
    inspired_by_recipe_id, created_by_user, created_at, last_updated_at, archived_at";

const MEAL_COLUMNS: &str = "\
    id, name, description, min_estimated_portions, max_estimated_portions, \
    eligible_for_meal_plans, created_by_user, created_at, last_updated_at, archived_at";

const MEAL_PLAN_COLUMNS: &str = "\
    id, household_id, notes, status, voting_deadline, created_by_user, \
    created_at, last_updated_at, archived_at";

pub struct RecipeRepo;

impl RecipeRepo {
    pub async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<Recipe>, sqlx::Error> {
        let query =
            format!("SELECT {RECIPE_COLUMNS} FROM recipes WHERE id = $1 AND archived_at IS NULL");
        sqlx::query_as::<_, Recipe>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list_created_by(pool: &PgPool, user_id: &str) -> Result<Vec<Recipe>, sqlx::Error> {
        let query = format!(
            "SELECT {RECIPE_COLUMNS} FROM recipes \
             WHERE created_by_user = $1 AND archived_at IS NULL \
             ORDER BY created_at, id"
        );
        sqlx::query_as::<_, Recipe>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }
}

pub struct MealRepo;

impl MealRepo {
    pub async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<Meal>, sqlx::Error> {
        let query =
            format!("SELECT {MEAL_COLUMNS} FROM meals WHERE id = $1 AND archived_at IS NULL");
        sqlx::query_as::<_, Meal>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list_created_by(pool: &PgPool, user_id: &str) -> Result<Vec<Meal>, sqlx::Error> {
        let query = format!(
            "SELECT {MEAL_COLUMNS} FROM meals \
             WHERE created_by_user = $1 AND archived_at IS NULL \
             ORDER BY created_at, id"
        );
        sqlx::query_as::<_, Meal>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }
}

pub struct MealPlanRepo;

impl MealPlanRepo {
    /// List the non-archived meal plans of any of the given households.
    pub async fn list_for_households(
        pool: &PgPool,
        household_ids: &[String],
    ) -> Result<Vec<MealPlan>, sqlx::Error> {
        let query = format!(
            "SELECT {MEAL_PLAN_COLUMNS} FROM meal_plans \
             WHERE household_id = ANY($1) AND archived_at IS NULL \
             ORDER BY created_at, id"
        );
        sqlx::query_as::<_, MealPlan>(&query)
            .bind(household_ids)
            .fetch_all(pool)
            .await
    }
}
