//! Repository layer: one zero-sized struct per table group, each exposing
//! `async fn`s that take a `&PgPool`.

pub mod oauth2_token_repo;
pub mod recipe_repo;
pub mod reference_repo;
pub mod search_index_repo;
pub mod user_repo;
pub mod webhook_repo;

pub use oauth2_token_repo::OAuth2TokenRepo;
pub use recipe_repo::{MealPlanRepo, MealRepo, RecipeRepo};
pub use reference_repo::ReferenceRepo;
pub use search_index_repo::{SearchIndexRepo, INDEXING_COHORT_LIMIT};
pub use user_repo::{HouseholdRepo, UserRepo};
pub use webhook_repo::WebhookRepo;
