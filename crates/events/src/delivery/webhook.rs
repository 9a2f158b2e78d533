//! Tenant webhook delivery.
//!
//! [`WebhookExecutor`] turns a [`WebhookExecutionRequest`] into one signed
//! HTTP request. Delivery is best-effort: transport failures and non-2xx
//! responses are logged and reported as success so a broken tenant endpoint
//! cannot wedge the queue. Only a missing household or a malformed signing
//! secret is returned as an error.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use ddb_core::signing::{decode_secret, sign_payload, SIGNATURE_HEADER};
use ddb_core::{CoreError, EventType};
use ddb_db::models::webhook::{CONTENT_TYPE_JSON, CONTENT_TYPE_XML};
use ddb_db::models::{
    Household, HouseholdInvitation, Meal, MealPlan, PasswordResetToken, Recipe, User, ValidIngredient,
    ValidIngredientMeasurementUnit, ValidIngredientPreparation, ValidIngredientState, ValidInstrument,
    ValidMeasurementUnit, ValidPreparation, ValidPreparationInstrument, ValidVessel, Webhook,
};
use ddb_db::{DataManager, DbError};
use ddb_messaging::{decode, HandlerError, MessageHandler};
use serde::Serialize;
use tracing::Instrument;

use crate::messages::{DataChangeMessage, WebhookExecutionRequest};

/// HTTP request timeout for a single delivery.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Root element of XML webhook bodies.
pub const XML_ROOT: &str = "DataChangeMessage";

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Failures that are worth redelivering the request for.
#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    #[error("Failed to load household: {0}")]
    Household(#[source] DbError),

    #[error("Household signing secret is malformed: {0}")]
    Secret(#[from] CoreError),
}

/// What happened to one execution request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// The endpoint answered 2xx.
    Delivered { status: u16 },
    /// The endpoint answered outside 2xx.
    Rejected { status: u16 },
    /// The request never got a response.
    TransportFailed,
    /// The webhook no longer exists for the household.
    WebhookMissing,
    /// The stored method is not a valid HTTP method.
    InvalidMethod,
    /// The payload could not be encoded for the webhook's content type.
    EncodingFailed,
}

// ---------------------------------------------------------------------------
// Serialization
// ---------------------------------------------------------------------------

/// Encode `payload` for `content_type`. Unrecognized content types produce
/// an empty body.
pub fn serialize_payload(content_type: &str, payload: &DataChangeMessage) -> Result<Vec<u8>, String> {
    match content_type {
        CONTENT_TYPE_JSON => serde_json::to_vec(payload).map_err(|e| e.to_string()),
        CONTENT_TYPE_XML => quick_xml::se::to_string_with_root(XML_ROOT, &XmlDataChangeMessage::from(payload))
            .map(String::into_bytes)
            .map_err(|e| e.to_string()),
        _ => Ok(Vec::new()),
    }
}

/// XML form of [`DataChangeMessage`].
///
/// Context keys are free-form, so they are carried as
/// `<entry key="...">value</entry>` rather than as element names.
#[derive(Serialize)]
struct XmlDataChangeMessage<'a> {
    event_type: EventType,
    #[serde(skip_serializing_if = "str::is_empty")]
    user_id: &'a str,
    #[serde(skip_serializing_if = "str::is_empty")]
    household_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    context: Option<XmlContext<'a>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    user: Option<&'a User>,
    #[serde(skip_serializing_if = "Option::is_none")]
    household: Option<&'a Household>,
    #[serde(skip_serializing_if = "Option::is_none")]
    webhook: Option<&'a Webhook>,
    #[serde(skip_serializing_if = "Option::is_none")]
    recipe: Option<&'a Recipe>,
    #[serde(skip_serializing_if = "Option::is_none")]
    meal: Option<&'a Meal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    meal_plan: Option<&'a MealPlan>,
    #[serde(skip_serializing_if = "Option::is_none")]
    valid_ingredient: Option<&'a ValidIngredient>,
    #[serde(skip_serializing_if = "Option::is_none")]
    valid_instrument: Option<&'a ValidInstrument>,
    #[serde(skip_serializing_if = "Option::is_none")]
    valid_measurement_unit: Option<&'a ValidMeasurementUnit>,
    #[serde(skip_serializing_if = "Option::is_none")]
    valid_preparation: Option<&'a ValidPreparation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    valid_ingredient_state: Option<&'a ValidIngredientState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    valid_ingredient_measurement_unit: Option<&'a ValidIngredientMeasurementUnit>,
    #[serde(skip_serializing_if = "Option::is_none")]
    valid_preparation_instrument: Option<&'a ValidPreparationInstrument>,
    #[serde(skip_serializing_if = "Option::is_none")]
    valid_ingredient_preparation: Option<&'a ValidIngredientPreparation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    valid_vessel: Option<&'a ValidVessel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    household_invitation: Option<&'a HouseholdInvitation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    password_reset_token: Option<&'a PasswordResetToken>,
    #[serde(skip_serializing_if = "Option::is_none")]
    email_verification_token: Option<&'a str>,
}

#[derive(Serialize)]
struct XmlContext<'a> {
    entry: Vec<XmlContextEntry<'a>>,
}

#[derive(Serialize)]
struct XmlContextEntry<'a> {
    #[serde(rename = "@key")]
    key: &'a str,
    #[serde(rename = "$text")]
    value: String,
}

impl<'a> From<&'a DataChangeMessage> for XmlDataChangeMessage<'a> {
    fn from(msg: &'a DataChangeMessage) -> Self {
        let context = (!msg.context.is_empty()).then(|| {
            let mut entry: Vec<_> = msg
                .context
                .iter()
                .map(|(key, value)| XmlContextEntry {
                    key,
                    value: match value {
                        serde_json::Value::String(s) => s.clone(),
                        other => other.to_string(),
                    },
                })
                .collect();
            entry.sort_by(|a, b| a.key.cmp(b.key));
            XmlContext { entry }
        });

        Self {
            event_type: msg.event_type,
            user_id: &msg.user_id,
            household_id: &msg.household_id,
            context,
            user: msg.user.as_ref(),
            household: msg.household.as_ref(),
            webhook: msg.webhook.as_ref(),
            recipe: msg.recipe.as_ref(),
            meal: msg.meal.as_ref(),
            meal_plan: msg.meal_plan.as_ref(),
            valid_ingredient: msg.valid_ingredient.as_ref(),
            valid_instrument: msg.valid_instrument.as_ref(),
            valid_measurement_unit: msg.valid_measurement_unit.as_ref(),
            valid_preparation: msg.valid_preparation.as_ref(),
            valid_ingredient_state: msg.valid_ingredient_state.as_ref(),
            valid_ingredient_measurement_unit: msg.valid_ingredient_measurement_unit.as_ref(),
            valid_preparation_instrument: msg.valid_preparation_instrument.as_ref(),
            valid_ingredient_preparation: msg.valid_ingredient_preparation.as_ref(),
            valid_vessel: msg.valid_vessel.as_ref(),
            household_invitation: msg.household_invitation.as_ref(),
            password_reset_token: msg.password_reset_token.as_ref(),
            email_verification_token: msg.email_verification_token.as_deref(),
        }
    }
}

// ---------------------------------------------------------------------------
// WebhookExecutor
// ---------------------------------------------------------------------------

pub struct WebhookExecutor {
    data: Arc<dyn DataManager>,
    client: reqwest::Client,
}

impl WebhookExecutor {
    pub fn new(data: Arc<dyn DataManager>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("Failed to build reqwest HTTP client");
        Self::with_client(data, client)
    }

    pub fn with_client(data: Arc<dyn DataManager>, client: reqwest::Client) -> Self {
        Self { data, client }
    }

    /// Sign and send one webhook request.
    pub async fn execute(&self, request: &WebhookExecutionRequest) -> Result<WebhookOutcome, WebhookError> {
        let household = self
            .data
            .get_household(&request.household_id)
            .await
            .map_err(WebhookError::Household)?;

        let webhook = match self.data.get_webhook(&request.webhook_id, &request.household_id).await {
            Ok(webhook) => webhook,
            Err(e) => {
                tracing::warn!(
                    webhook_id = %request.webhook_id,
                    household_id = %request.household_id,
                    error = %e,
                    "Webhook not available, dropping execution request"
                );
                return Ok(WebhookOutcome::WebhookMissing);
            }
        };

        let body = match serialize_payload(&webhook.content_type, &request.payload) {
            Ok(body) => body,
            Err(e) => {
                tracing::error!(
                    webhook_id = %webhook.id,
                    content_type = %webhook.content_type,
                    error = %e,
                    "Failed to encode webhook payload"
                );
                return Ok(WebhookOutcome::EncodingFailed);
            }
        };

        let secret = decode_secret(&household.webhook_hmac_secret)?;

        let method = match reqwest::Method::from_bytes(webhook.method.trim().to_ascii_uppercase().as_bytes()) {
            Ok(method) => method,
            Err(e) => {
                tracing::error!(webhook_id = %webhook.id, method = %webhook.method, error = %e, "Invalid webhook method");
                return Ok(WebhookOutcome::InvalidMethod);
            }
        };

        let signature = sign_payload(&secret, &body);

        let span = tracing::info_span!(
            "webhook_delivery",
            webhook_id = %webhook.id,
            household_id = %household.id,
            url = %webhook.url,
            event_type = %request.payload.event_type,
        );

        let send = self
            .client
            .request(method, &webhook.url)
            .header(reqwest::header::CONTENT_TYPE, webhook.content_type.as_str())
            .header(SIGNATURE_HEADER, signature)
            .body(body)
            .send();

        async move {
            match send.await {
                Ok(response) if response.status().is_success() => {
                    let status = response.status().as_u16();
                    tracing::info!(status, "Webhook delivered");
                    Ok(WebhookOutcome::Delivered { status })
                }
                Ok(response) => {
                    let status = response.status().as_u16();
                    tracing::warn!(status, "Webhook endpoint returned non-success status");
                    Ok(WebhookOutcome::Rejected { status })
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Webhook request failed");
                    Ok(WebhookOutcome::TransportFailed)
                }
            }
        }
        .instrument(span)
        .await
    }
}

#[async_trait]
impl MessageHandler for WebhookExecutor {
    async fn handle(&self, payload: &[u8]) -> Result<(), HandlerError> {
        let request: WebhookExecutionRequest = decode(payload)?;
        self.execute(&request).await?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use ddb_core::EventType;
    use ddb_db::models::Recipe;

    use super::*;

    fn recipe_created() -> DataChangeMessage {
        let mut msg = DataChangeMessage::new(EventType::RecipeCreated).with_household_id("H1");
        msg.recipe = Some(Recipe {
            id: "R1".into(),
            name: "Soup".into(),
            ..Default::default()
        });
        msg
    }

    #[test]
    fn json_body_is_the_envelope() {
        let body = serialize_payload(CONTENT_TYPE_JSON, &recipe_created()).unwrap();
        let decoded: DataChangeMessage = serde_json::from_slice(&body).unwrap();
        assert_eq!(decoded, recipe_created());
    }

    #[test]
    fn xml_body_has_named_root() {
        let body = String::from_utf8(serialize_payload(CONTENT_TYPE_XML, &recipe_created()).unwrap()).unwrap();
        assert!(body.starts_with("<DataChangeMessage>"));
        assert!(body.contains("<event_type>recipe.created</event_type>"));
        assert!(body.contains("<name>Soup</name>"));
        assert!(body.ends_with("</DataChangeMessage>"));
    }

    #[test]
    fn xml_context_keys_need_not_be_element_names() {
        let mut msg = recipe_created();
        msg.context.insert("request id".into(), serde_json::json!("abc-123"));
        msg.context.insert("attempt".into(), serde_json::json!(2));

        let body = String::from_utf8(serialize_payload(CONTENT_TYPE_XML, &msg).unwrap()).unwrap();
        assert!(body.contains(
            r#"<context><entry key="attempt">2</entry><entry key="request id">abc-123</entry></context>"#
        ));
    }

    #[test]
    fn xml_omits_empty_context() {
        let body = String::from_utf8(serialize_payload(CONTENT_TYPE_XML, &recipe_created()).unwrap()).unwrap();
        assert!(!body.contains("<context"));
        assert!(body.contains("<household_id>H1</household_id>"));
    }

    #[test]
    fn unknown_content_type_gives_empty_body() {
        assert!(serialize_payload("text/plain", &recipe_created()).unwrap().is_empty());
    }
}
