//! Composite export produced for user-data aggregation requests.

use ddb_core::types::Timestamp;
use serde::{Deserialize, Serialize};

use super::{Household, Meal, MealPlan, Recipe, User, Webhook};

/// Everything the platform holds that belongs to, or was created by, a user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserDataCollection {
    pub user: User,
    pub households: Vec<Household>,
    pub recipes: Vec<Recipe>,
    pub meals: Vec<Meal>,
    pub meal_plans: Vec<MealPlan>,
    pub webhooks: Vec<Webhook>,
    pub generated_at: Timestamp,
}
