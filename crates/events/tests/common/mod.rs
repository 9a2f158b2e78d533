//! In-memory stand-ins for the datastore, the broker, analytics, and email.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use ddb_core::{EventType, IndexType};
use ddb_db::models::{
    Household, Meal, Recipe, User, UserDataCollection, ValidIngredient, ValidIngredientState, ValidInstrument,
    ValidMeasurementUnit, ValidPreparation, ValidVessel, Webhook,
};
use ddb_db::{DataManager, DbError};
use ddb_events::analytics::{AnalyticsError, EventReporter, Properties};
use ddb_events::delivery::email::{EmailError, Emailer};
use ddb_events::OutboundEmailMessage;
use ddb_messaging::{MessagingError, Publisher};
use serde::de::DeserializeOwned;

/// Hex of the bytes `de ad be ef` repeated to 32 bytes.
pub const SECRET_HEX: &str = "deadbeefdeadbeefdeadbeefdeadbeefdeadbeefdeadbeefdeadbeefdeadbeef";

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

pub fn verified_user(id: &str) -> User {
    User {
        id: id.into(),
        username: format!("user-{id}"),
        email_address: format!("{}@example.com", id.to_lowercase()),
        first_name: "Test".into(),
        last_name: id.into(),
        email_address_verified_at: Some(Utc::now()),
        ..Default::default()
    }
}

pub fn unverified_user(id: &str) -> User {
    User {
        email_address_verified_at: None,
        ..verified_user(id)
    }
}

pub fn household(id: &str) -> Household {
    Household {
        id: id.into(),
        name: format!("Household {id}"),
        webhook_hmac_secret: SECRET_HEX.into(),
        ..Default::default()
    }
}

pub fn webhook(id: &str, household_id: &str, url: &str, content_type: &str) -> Webhook {
    Webhook {
        id: id.into(),
        name: format!("hook {id}"),
        household_id: household_id.into(),
        url: url.into(),
        method: "POST".into(),
        content_type: content_type.into(),
        ..Default::default()
    }
}

pub fn recipe(id: &str) -> Recipe {
    Recipe {
        id: id.into(),
        name: format!("Recipe {id}"),
        slug: format!("recipe-{}", id.to_lowercase()),
        description: "A test recipe".into(),
        ..Default::default()
    }
}

// ---------------------------------------------------------------------------
// FakeDataManager
// ---------------------------------------------------------------------------

/// Hash-map backed [`DataManager`] that records indexing marks and pages.
#[derive(Default)]
pub struct FakeDataManager {
    pub users: Mutex<HashMap<String, User>>,
    pub households: Mutex<HashMap<String, Household>>,
    pub members: Mutex<HashMap<String, Vec<String>>>,
    /// `(event_type, webhook)` subscriptions, in creation order.
    pub webhooks: Mutex<Vec<(EventType, Webhook)>>,
    pub recipes: Mutex<HashMap<String, Recipe>>,
    pub meals: Mutex<HashMap<String, Meal>>,
    pub valid_ingredients: Mutex<HashMap<String, ValidIngredient>>,
    pub needs_indexing: Mutex<HashMap<IndexType, Result<Vec<String>, &'static str>>>,
    pub live_ids: Mutex<HashMap<IndexType, Vec<String>>>,
    pub exports: Mutex<HashMap<String, UserDataCollection>>,
    pub expired_tokens: Mutex<u64>,

    pub fail_webhook_lookup: Mutex<bool>,
    pub marked: Mutex<Vec<(IndexType, String)>>,
    pub pages: Mutex<Vec<(IndexType, i64, i64)>>,
}

impl FakeDataManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_user(&self, user: User) {
        self.users.lock().unwrap().insert(user.id.clone(), user);
    }

    pub fn add_household(&self, household: Household, member_ids: &[&str]) {
        self.members
            .lock()
            .unwrap()
            .insert(household.id.clone(), member_ids.iter().map(|m| m.to_string()).collect());
        self.households.lock().unwrap().insert(household.id.clone(), household);
    }

    pub fn subscribe(&self, event_type: EventType, webhook: Webhook) {
        self.webhooks.lock().unwrap().push((event_type, webhook));
    }

    pub fn add_recipe(&self, recipe: Recipe) {
        self.recipes.lock().unwrap().insert(recipe.id.clone(), recipe);
    }

    pub fn set_live_ids(&self, index_type: IndexType, ids: Vec<String>) {
        self.live_ids.lock().unwrap().insert(index_type, ids);
    }

    pub fn set_needs_indexing(&self, index_type: IndexType, ids: Result<Vec<String>, &'static str>) {
        self.needs_indexing.lock().unwrap().insert(index_type, ids);
    }

    pub fn marked(&self) -> Vec<(IndexType, String)> {
        self.marked.lock().unwrap().clone()
    }

    pub fn pages(&self) -> Vec<(IndexType, i64, i64)> {
        self.pages.lock().unwrap().clone()
    }
}

fn lookup<T: Clone>(map: &Mutex<HashMap<String, T>>, entity: &'static str, id: &str) -> Result<T, DbError> {
    map.lock()
        .unwrap()
        .get(id)
        .cloned()
        .ok_or_else(|| DbError::not_found(entity, id))
}

#[async_trait]
impl DataManager for FakeDataManager {
    async fn get_webhooks_for_household_and_event(
        &self,
        household_id: &str,
        event_type: EventType,
    ) -> Result<Vec<Webhook>, DbError> {
        if *self.fail_webhook_lookup.lock().unwrap() {
            return Err(DbError::Sqlx(sqlx::Error::PoolTimedOut));
        }
        Ok(self
            .webhooks
            .lock()
            .unwrap()
            .iter()
            .filter(|(e, w)| *e == event_type && w.household_id == household_id && !w.is_archived())
            .map(|(_, w)| w.clone())
            .collect())
    }

    async fn get_webhook(&self, webhook_id: &str, household_id: &str) -> Result<Webhook, DbError> {
        self.webhooks
            .lock()
            .unwrap()
            .iter()
            .map(|(_, w)| w)
            .find(|w| w.id == webhook_id && w.household_id == household_id && !w.is_archived())
            .cloned()
            .ok_or_else(|| DbError::not_found("webhook", webhook_id))
    }

    async fn get_household(&self, household_id: &str) -> Result<Household, DbError> {
        lookup(&self.households, "household", household_id)
    }

    async fn get_user(&self, user_id: &str) -> Result<User, DbError> {
        lookup(&self.users, "user", user_id)
    }

    async fn get_household_members(&self, household_id: &str) -> Result<Vec<User>, DbError> {
        let ids = self.members.lock().unwrap().get(household_id).cloned().unwrap_or_default();
        let users = self.users.lock().unwrap();
        Ok(ids.iter().filter_map(|id| users.get(id).cloned()).collect())
    }

    async fn get_recipe(&self, id: &str) -> Result<Recipe, DbError> {
        lookup(&self.recipes, "recipe", id)
    }

    async fn get_meal(&self, id: &str) -> Result<Meal, DbError> {
        lookup(&self.meals, "meal", id)
    }

    async fn get_valid_ingredient(&self, id: &str) -> Result<ValidIngredient, DbError> {
        lookup(&self.valid_ingredients, "valid_ingredient", id)
    }

    async fn get_valid_instrument(&self, id: &str) -> Result<ValidInstrument, DbError> {
        Err(DbError::not_found("valid_instrument", id))
    }

    async fn get_valid_measurement_unit(&self, id: &str) -> Result<ValidMeasurementUnit, DbError> {
        Err(DbError::not_found("valid_measurement_unit", id))
    }

    async fn get_valid_preparation(&self, id: &str) -> Result<ValidPreparation, DbError> {
        Err(DbError::not_found("valid_preparation", id))
    }

    async fn get_valid_ingredient_state(&self, id: &str) -> Result<ValidIngredientState, DbError> {
        Err(DbError::not_found("valid_ingredient_state", id))
    }

    async fn get_valid_vessel(&self, id: &str) -> Result<ValidVessel, DbError> {
        Err(DbError::not_found("valid_vessel", id))
    }

    async fn get_ids_needing_indexing(&self, index_type: IndexType) -> Result<Vec<String>, DbError> {
        match self.needs_indexing.lock().unwrap().get(&index_type) {
            None => Err(DbError::Sqlx(sqlx::Error::RowNotFound)),
            Some(Ok(ids)) => Ok(ids.clone()),
            Some(Err(_)) => Err(DbError::Sqlx(sqlx::Error::PoolTimedOut)),
        }
    }

    async fn get_ids_for_index(&self, index_type: IndexType, offset: i64, limit: i64) -> Result<Vec<String>, DbError> {
        self.pages.lock().unwrap().push((index_type, offset, limit));
        let ids = self.live_ids.lock().unwrap().get(&index_type).cloned().unwrap_or_default();
        Ok(ids.into_iter().skip(offset as usize).take(limit as usize).collect())
    }

    async fn mark_as_indexed(&self, index_type: IndexType, id: &str) -> Result<(), DbError> {
        self.marked.lock().unwrap().push((index_type, id.to_string()));
        Ok(())
    }

    async fn delete_expired_oauth2_client_tokens(&self) -> Result<u64, DbError> {
        Ok(std::mem::take(&mut *self.expired_tokens.lock().unwrap()))
    }

    async fn aggregate_user_data(&self, user_id: &str) -> Result<UserDataCollection, DbError> {
        lookup(&self.exports, "user", user_id)
    }
}

// ---------------------------------------------------------------------------
// RecordingPublisher
// ---------------------------------------------------------------------------

/// Captures every published body. Optionally fails or hangs on publish.
pub struct RecordingPublisher {
    topic: String,
    pub published: Mutex<Vec<Vec<u8>>>,
    pub fail: Mutex<bool>,
    pub hang: Mutex<bool>,
}

impl RecordingPublisher {
    pub fn new(topic: &str) -> Self {
        Self {
            topic: topic.to_string(),
            published: Mutex::new(Vec::new()),
            fail: Mutex::new(false),
            hang: Mutex::new(false),
        }
    }

    pub fn count(&self) -> usize {
        self.published.lock().unwrap().len()
    }

    pub fn decoded<T: DeserializeOwned>(&self) -> Vec<T> {
        self.published
            .lock()
            .unwrap()
            .iter()
            .map(|body| serde_json::from_slice(body).expect("published body should decode"))
            .collect()
    }
}

#[async_trait]
impl Publisher for RecordingPublisher {
    fn topic(&self) -> &str {
        &self.topic
    }

    async fn publish_bytes(&self, payload: Vec<u8>) -> Result<(), MessagingError> {
        let hang = *self.hang.lock().unwrap();
        if hang {
            std::future::pending::<()>().await;
        }
        if *self.fail.lock().unwrap() {
            return Err(MessagingError::Closed(self.topic.clone()));
        }
        self.published.lock().unwrap().push(payload);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Analytics and email
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalyticsCall {
    AddUser(String),
    EventOccurred(EventType, String),
}

#[derive(Default)]
pub struct RecordingReporter {
    pub calls: Mutex<Vec<AnalyticsCall>>,
    pub hang: Mutex<bool>,
}

impl RecordingReporter {
    pub fn calls(&self) -> Vec<AnalyticsCall> {
        self.calls.lock().unwrap().clone()
    }

    async fn maybe_hang(&self) {
        let hang = *self.hang.lock().unwrap();
        if hang {
            std::future::pending::<()>().await;
        }
    }
}

#[async_trait]
impl EventReporter for RecordingReporter {
    async fn add_user(&self, user_id: &str, _properties: &Properties) -> Result<(), AnalyticsError> {
        self.maybe_hang().await;
        self.calls.lock().unwrap().push(AnalyticsCall::AddUser(user_id.to_string()));
        Ok(())
    }

    async fn event_occurred(
        &self,
        event_type: EventType,
        user_id: &str,
        _properties: &Properties,
    ) -> Result<(), AnalyticsError> {
        self.maybe_hang().await;
        self.calls
            .lock()
            .unwrap()
            .push(AnalyticsCall::EventOccurred(event_type, user_id.to_string()));
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingEmailer {
    pub sent: Mutex<Vec<OutboundEmailMessage>>,
}

#[async_trait]
impl Emailer for RecordingEmailer {
    async fn send(&self, email: &OutboundEmailMessage) -> Result<(), EmailError> {
        self.sent.lock().unwrap().push(email.clone());
        Ok(())
    }
}
