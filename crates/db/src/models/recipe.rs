//! Recipe, meal, and meal plan models.

use ddb_core::types::{EntityId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// ---------------------------------------------------------------------------
// Recipe
// ---------------------------------------------------------------------------

/// A row from the `recipes` table.
#[derive(Debug, Clone, Default, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Recipe {
    pub id: EntityId,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub source: String,
    pub min_estimated_portions: f32,
    pub max_estimated_portions: Option<f32>,
    pub portion_name: String,
    pub plural_portion_name: String,
    pub inspired_by_recipe_id: Option<EntityId>,
    pub created_by_user: EntityId,
    pub created_at: Timestamp,
    pub last_updated_at: Option<Timestamp>,
    pub archived_at: Option<Timestamp>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeSearchSubset {
    pub id: EntityId,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub source: String,
}

impl From<&Recipe> for RecipeSearchSubset {
    fn from(recipe: &Recipe) -> Self {
        Self {
            id: recipe.id.clone(),
            name: recipe.name.clone(),
            slug: recipe.slug.clone(),
            description: recipe.description.clone(),
            source: recipe.source.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Meal
// ---------------------------------------------------------------------------

/// A row from the `meals` table.
#[derive(Debug, Clone, Default, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Meal {
    pub id: EntityId,
    pub name: String,
    pub description: String,
    pub min_estimated_portions: f32,
    pub max_estimated_portions: Option<f32>,
    pub eligible_for_meal_plans: bool,
    pub created_by_user: EntityId,
    pub created_at: Timestamp,
    pub last_updated_at: Option<Timestamp>,
    pub archived_at: Option<Timestamp>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MealSearchSubset {
    pub id: EntityId,
    pub name: String,
    pub description: String,
}

impl From<&Meal> for MealSearchSubset {
    fn from(meal: &Meal) -> Self {
        Self {
            id: meal.id.clone(),
            name: meal.name.clone(),
            description: meal.description.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Meal plan
// ---------------------------------------------------------------------------

/// A row from the `meal_plans` table.
#[derive(Debug, Clone, Default, PartialEq, FromRow, Serialize, Deserialize)]
pub struct MealPlan {
    pub id: EntityId,
    pub household_id: EntityId,
    pub notes: String,
    pub status: String,
    pub voting_deadline: Timestamp,
    pub created_by_user: EntityId,
    pub created_at: Timestamp,
    pub last_updated_at: Option<Timestamp>,
    pub archived_at: Option<Timestamp>,
}
