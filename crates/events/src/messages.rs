//! Message bodies carried on the topics.
//!
//! All of them are JSON on the wire. [`DataChangeMessage`] is also the body
//! delivered to tenant webhooks, as JSON or as XML under a
//! `<DataChangeMessage>` root element.

use std::collections::HashMap;

use ddb_core::{CoreError, EventType, IndexType};
use ddb_db::models::{
    Household, HouseholdInvitation, Meal, MealPlan, PasswordResetToken, Recipe, User,
    ValidIngredient, ValidIngredientMeasurementUnit, ValidIngredientPreparation,
    ValidIngredientState, ValidInstrument, ValidMeasurementUnit, ValidPreparation,
    ValidPreparationInstrument, ValidVessel, Webhook,
};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// DataChangeMessage
// ---------------------------------------------------------------------------

/// The envelope the API writes to `data_changes` for every domain event.
///
/// `user_id` and `household_id` are empty when absent. At most one payload
/// slot is normally populated; empty slots are omitted from the encoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataChangeMessage {
    pub event_type: EventType,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub user_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub household_id: String,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub context: HashMap<String, serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub household: Option<Household>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook: Option<Webhook>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipe: Option<Recipe>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meal: Option<Meal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meal_plan: Option<MealPlan>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid_ingredient: Option<ValidIngredient>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid_instrument: Option<ValidInstrument>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid_measurement_unit: Option<ValidMeasurementUnit>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid_preparation: Option<ValidPreparation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid_ingredient_state: Option<ValidIngredientState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid_ingredient_measurement_unit: Option<ValidIngredientMeasurementUnit>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid_preparation_instrument: Option<ValidPreparationInstrument>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid_ingredient_preparation: Option<ValidIngredientPreparation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid_vessel: Option<ValidVessel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub household_invitation: Option<HouseholdInvitation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_reset_token: Option<PasswordResetToken>,
    /// The raw verification token, not a row.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_verification_token: Option<String>,
}

impl DataChangeMessage {
    /// A message of `event_type` with no actor, household, context or payload.
    pub fn new(event_type: EventType) -> Self {
        Self {
            event_type,
            user_id: String::new(),
            household_id: String::new(),
            context: HashMap::new(),
            user: None,
            household: None,
            webhook: None,
            recipe: None,
            meal: None,
            meal_plan: None,
            valid_ingredient: None,
            valid_instrument: None,
            valid_measurement_unit: None,
            valid_preparation: None,
            valid_ingredient_state: None,
            valid_ingredient_measurement_unit: None,
            valid_preparation_instrument: None,
            valid_ingredient_preparation: None,
            valid_vessel: None,
            household_invitation: None,
            password_reset_token: None,
            email_verification_token: None,
        }
    }

    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = user_id.into();
        self
    }

    pub fn with_household_id(mut self, household_id: impl Into<String>) -> Self {
        self.household_id = household_id.into();
        self
    }
}

// ---------------------------------------------------------------------------
// Derived messages
// ---------------------------------------------------------------------------

/// One webhook firing, produced by the fan-out per matching webhook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookExecutionRequest {
    pub webhook_id: String,
    pub household_id: String,
    pub payload: DataChangeMessage,
}

/// A request to bring one row of one search index up to date.
///
/// `index_type` stays a string on the wire so requests for index types this
/// build does not know still decode; [`validate`](Self::validate) rejects
/// them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexRequest {
    pub row_id: String,
    pub index_type: String,
    #[serde(default)]
    pub delete: bool,
}

impl IndexRequest {
    pub fn upsert(index_type: IndexType, row_id: impl Into<String>) -> Self {
        Self {
            row_id: row_id.into(),
            index_type: index_type.as_str().to_string(),
            delete: false,
        }
    }

    pub fn removal(index_type: IndexType, row_id: impl Into<String>) -> Self {
        Self {
            delete: true,
            ..Self::upsert(index_type, row_id)
        }
    }

    /// Check the row id is present and resolve the index type.
    pub fn validate(&self) -> Result<IndexType, CoreError> {
        if self.row_id.trim().is_empty() {
            return Err(CoreError::Validation("index request has an empty row_id".into()));
        }
        self.index_type.parse()
    }
}

/// A fully rendered email, ready for the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundEmailMessage {
    pub to_address: String,
    pub to_name: String,
    pub from_address: String,
    pub from_name: String,
    pub subject: String,
    pub html_content: String,
    /// The user the email concerns, for auditing.
    #[serde(default)]
    pub user_id: String,
}

/// Asks for a user's data export to be written to object storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDataAggregationRequest {
    pub report_id: String,
    pub user_id: String,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
