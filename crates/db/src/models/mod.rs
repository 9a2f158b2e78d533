pub mod export;
pub mod recipe;
pub mod reference;
pub mod token;
pub mod user;
pub mod webhook;

pub use export::UserDataCollection;
pub use recipe::{Meal, MealPlan, MealSearchSubset, Recipe, RecipeSearchSubset};
pub use reference::{
    ReferenceSearchSubset, ValidIngredient, ValidIngredientMeasurementUnit,
    ValidIngredientPreparation, ValidIngredientState, ValidInstrument, ValidMeasurementUnit,
    ValidPreparation, ValidPreparationInstrument, ValidVessel,
};
pub use token::{HouseholdInvitation, PasswordResetToken};
pub use user::{Household, User, UserSearchSubset};
pub use webhook::Webhook;
