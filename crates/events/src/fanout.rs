//! Data-change fan-out.
//!
//! Every [`DataChangeMessage`] on `data_changes` runs three independent
//! branches concurrently, alongside the analytics report:
//!
//! 1. **webhooks**: one [`WebhookExecutionRequest`] per matching webhook,
//! 2. **notifications**: the emails chosen by [`NotificationDispatcher`],
//! 3. **search index**: at most one [`IndexRequest`], chosen by [`INDEX_ROUTES`].
//!
//! A branch that fails or times out is logged and skipped. The message is
//! only rejected (and so redelivered) when it does not decode; redelivering
//! a whole envelope because one branch failed would re-fire the others.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use ddb_core::{EventType, IndexType};
use ddb_db::{DataManager, DbError};
use ddb_messaging::{decode, HandlerError, MessageHandler, MessagingError, Publisher};
use tracing::Instrument;

use crate::analytics::EventReporter;
use crate::messages::{DataChangeMessage, IndexRequest, WebhookExecutionRequest};
use crate::notifications::NotificationDispatcher;

/// Default per-branch deadline.
pub const DEFAULT_BRANCH_TIMEOUT: Duration = Duration::from_secs(30);

// ---------------------------------------------------------------------------
// Event -> index routing
// ---------------------------------------------------------------------------

/// Picks the id of the affected row out of a message.
pub type RowSelector = fn(&DataChangeMessage) -> Option<&str>;

/// How one event type affects the search index.
#[derive(Clone, Copy)]
pub struct IndexRoute {
    pub event_type: EventType,
    pub index_type: IndexType,
    pub delete: bool,
    pub selector: RowSelector,
}

impl std::fmt::Debug for IndexRoute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexRoute")
            .field("event_type", &self.event_type)
            .field("index_type", &self.index_type)
            .field("delete", &self.delete)
            .finish()
    }
}

fn non_empty(id: &str) -> Option<&str> {
    (!id.is_empty()).then_some(id)
}

/// The user slot, falling back to the actor for events that carry no user.
fn user_row(m: &DataChangeMessage) -> Option<&str> {
    m.user
        .as_ref()
        .and_then(|u| non_empty(&u.id))
        .or_else(|| non_empty(&m.user_id))
}

macro_rules! slot_selectors {
    ($($name:ident => $slot:ident,)+) => {
        $(
            fn $name(m: &DataChangeMessage) -> Option<&str> {
                m.$slot.as_ref().and_then(|row| non_empty(&row.id))
            }
        )+
    };
}

slot_selectors! {
    recipe_row => recipe,
    meal_row => meal,
    valid_ingredient_row => valid_ingredient,
    valid_instrument_row => valid_instrument,
    valid_preparation_row => valid_preparation,
    valid_measurement_unit_row => valid_measurement_unit,
    valid_ingredient_state_row => valid_ingredient_state,
    valid_vessel_row => valid_vessel,
}

const fn route(event_type: EventType, index_type: IndexType, delete: bool, selector: RowSelector) -> IndexRoute {
    IndexRoute {
        event_type,
        index_type,
        delete,
        selector,
    }
}

/// Event types that touch a search index. Created/updated upsert, archived
/// deletes; everything else leaves the index alone.
pub static INDEX_ROUTES: &[IndexRoute] = &[
    route(EventType::UserSignedUp, IndexType::Users, false, user_row),
    route(EventType::UserArchived, IndexType::Users, true, user_row),
    route(EventType::RecipeCreated, IndexType::Recipes, false, recipe_row),
    route(EventType::RecipeUpdated, IndexType::Recipes, false, recipe_row),
    route(EventType::RecipeArchived, IndexType::Recipes, true, recipe_row),
    route(EventType::MealCreated, IndexType::Meals, false, meal_row),
    route(EventType::MealUpdated, IndexType::Meals, false, meal_row),
    route(EventType::MealArchived, IndexType::Meals, true, meal_row),
    route(EventType::ValidIngredientCreated, IndexType::ValidIngredients, false, valid_ingredient_row),
    route(EventType::ValidIngredientUpdated, IndexType::ValidIngredients, false, valid_ingredient_row),
    route(EventType::ValidIngredientArchived, IndexType::ValidIngredients, true, valid_ingredient_row),
    route(EventType::ValidInstrumentCreated, IndexType::ValidInstruments, false, valid_instrument_row),
    route(EventType::ValidInstrumentUpdated, IndexType::ValidInstruments, false, valid_instrument_row),
    route(EventType::ValidInstrumentArchived, IndexType::ValidInstruments, true, valid_instrument_row),
    route(EventType::ValidPreparationCreated, IndexType::ValidPreparations, false, valid_preparation_row),
    route(EventType::ValidPreparationUpdated, IndexType::ValidPreparations, false, valid_preparation_row),
    route(EventType::ValidPreparationArchived, IndexType::ValidPreparations, true, valid_preparation_row),
    route(EventType::ValidMeasurementUnitCreated, IndexType::ValidMeasurementUnits, false, valid_measurement_unit_row),
    route(EventType::ValidMeasurementUnitUpdated, IndexType::ValidMeasurementUnits, false, valid_measurement_unit_row),
    route(EventType::ValidMeasurementUnitArchived, IndexType::ValidMeasurementUnits, true, valid_measurement_unit_row),
    route(EventType::ValidIngredientStateCreated, IndexType::ValidIngredientStates, false, valid_ingredient_state_row),
    route(EventType::ValidIngredientStateUpdated, IndexType::ValidIngredientStates, false, valid_ingredient_state_row),
    route(EventType::ValidIngredientStateArchived, IndexType::ValidIngredientStates, true, valid_ingredient_state_row),
    route(EventType::ValidVesselCreated, IndexType::ValidVessels, false, valid_vessel_row),
    route(EventType::ValidVesselUpdated, IndexType::ValidVessels, false, valid_vessel_row),
    route(EventType::ValidVesselArchived, IndexType::ValidVessels, true, valid_vessel_row),
];

pub fn index_route(event_type: EventType) -> Option<&'static IndexRoute> {
    INDEX_ROUTES.iter().find(|r| r.event_type == event_type)
}

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum FanoutError {
    #[error("Failed to load webhooks: {0}")]
    Data(#[from] DbError),

    #[error(transparent)]
    Publish(#[from] MessagingError),
}

/// Per-branch results of one fan-out, for logging and tests.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FanoutSummary {
    pub webhook_requests: usize,
    pub emails: usize,
    pub index_requests: usize,
}

// ---------------------------------------------------------------------------
// DataChangeFanout
// ---------------------------------------------------------------------------

pub struct DataChangeFanout {
    data: Arc<dyn DataManager>,
    reporter: Arc<dyn EventReporter>,
    webhook_requests: Arc<dyn Publisher>,
    index_requests: Arc<dyn Publisher>,
    notifications: NotificationDispatcher,
    branch_timeout: Duration,
}

impl DataChangeFanout {
    pub fn new(
        data: Arc<dyn DataManager>,
        reporter: Arc<dyn EventReporter>,
        webhook_requests: Arc<dyn Publisher>,
        index_requests: Arc<dyn Publisher>,
        notifications: NotificationDispatcher,
    ) -> Self {
        Self {
            data,
            reporter,
            webhook_requests,
            index_requests,
            notifications,
            branch_timeout: DEFAULT_BRANCH_TIMEOUT,
        }
    }

    pub fn with_branch_timeout(mut self, timeout: Duration) -> Self {
        self.branch_timeout = timeout;
        self
    }

    /// Report to analytics and run all three branches. Branch failures are
    /// logged, never returned.
    pub async fn process(&self, msg: &DataChangeMessage) -> FanoutSummary {
        let span = tracing::info_span!(
            "data_change",
            event_type = %msg.event_type,
            household_id = %msg.household_id,
            user_id = %msg.user_id,
        );

        async {
            let ((), webhooks, emails, index) = tokio::join!(
                self.report_analytics(msg),
                self.guarded("webhooks", self.dispatch_webhooks(msg)),
                self.guarded("notifications", self.notifications.dispatch(msg)),
                self.guarded("search_index", self.dispatch_index_request(msg)),
            );

            let summary = FanoutSummary {
                webhook_requests: webhooks.unwrap_or(0),
                emails: emails.unwrap_or(0),
                index_requests: index.unwrap_or(0),
            };
            tracing::debug!(?summary, "Data change processed");
            summary
        }
        .instrument(span)
        .await
    }

    /// Apply the branch deadline and log failure. `None` means the branch
    /// failed or timed out.
    async fn guarded<E: std::fmt::Display>(
        &self,
        branch: &'static str,
        fut: impl std::future::Future<Output = Result<usize, E>>,
    ) -> Option<usize> {
        match tokio::time::timeout(self.branch_timeout, fut).await {
            Ok(Ok(count)) => Some(count),
            Ok(Err(e)) => {
                tracing::error!(branch, error = %e, "Fan-out branch failed");
                None
            }
            Err(_) => {
                tracing::error!(branch, timeout_secs = self.branch_timeout.as_secs_f64(), "Fan-out branch timed out");
                None
            }
        }
    }

    /// Best-effort, under the same deadline as the branches.
    async fn report_analytics(&self, msg: &DataChangeMessage) {
        if msg.user_id.is_empty() {
            return;
        }
        let report = async {
            if msg.event_type == EventType::UserSignedUp {
                self.reporter.add_user(&msg.user_id, &msg.context).await
            } else {
                self.reporter.event_occurred(msg.event_type, &msg.user_id, &msg.context).await
            }
        };
        match tokio::time::timeout(self.branch_timeout, report).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::warn!(error = %e, "Failed to report event to analytics"),
            Err(_) => tracing::warn!(
                timeout_secs = self.branch_timeout.as_secs_f64(),
                "Analytics report timed out"
            ),
        }
    }

    async fn dispatch_webhooks(&self, msg: &DataChangeMessage) -> Result<usize, FanoutError> {
        if msg.household_id.is_empty() || !msg.event_type.triggers_webhooks() {
            return Ok(0);
        }

        let webhooks = self
            .data
            .get_webhooks_for_household_and_event(&msg.household_id, msg.event_type)
            .await?;

        let mut published = 0;
        for webhook in webhooks {
            let request = WebhookExecutionRequest {
                webhook_id: webhook.id,
                household_id: msg.household_id.clone(),
                payload: msg.clone(),
            };
            match self.webhook_requests.publish(&request).await {
                Ok(()) => published += 1,
                Err(e) => tracing::error!(
                    webhook_id = %request.webhook_id,
                    error = %e,
                    "Failed to publish webhook execution request"
                ),
            }
        }
        Ok(published)
    }

    async fn dispatch_index_request(&self, msg: &DataChangeMessage) -> Result<usize, FanoutError> {
        let Some(route) = index_route(msg.event_type) else {
            return Ok(0);
        };
        let Some(row_id) = (route.selector)(msg) else {
            tracing::warn!(
                index_type = %route.index_type,
                "Event is missing the payload needed to update the search index, skipping"
            );
            return Ok(0);
        };

        let request = IndexRequest {
            row_id: row_id.to_string(),
            index_type: route.index_type.as_str().to_string(),
            delete: route.delete,
        };
        self.index_requests.publish(&request).await?;
        Ok(1)
    }
}

#[async_trait]
impl MessageHandler for DataChangeFanout {
    async fn handle(&self, payload: &[u8]) -> Result<(), HandlerError> {
        let msg: DataChangeMessage = decode(payload)?;
        self.process(&msg).await;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use ddb_db::models::{Recipe, ValidVessel};

    use super::*;

    #[test]
    fn routes_are_unique_per_event_type() {
        let mut seen = HashSet::new();
        for route in INDEX_ROUTES {
            assert!(seen.insert(route.event_type), "duplicate route for {}", route.event_type);
        }
    }

    #[test]
    fn archived_events_delete_and_others_upsert() {
        for route in INDEX_ROUTES {
            let archived = route.event_type.as_str().ends_with(".archived");
            assert_eq!(route.delete, archived, "{}", route.event_type);
        }
    }

    #[test]
    fn every_index_type_has_an_upsert_route() {
        for index_type in IndexType::ALL {
            assert!(
                INDEX_ROUTES.iter().any(|r| r.index_type == *index_type && !r.delete),
                "{index_type} has no upsert route"
            );
        }
    }

    #[test]
    fn non_indexed_events_have_no_route() {
        assert!(index_route(EventType::WebhookCreated).is_none());
        assert!(index_route(EventType::MealPlanCreated).is_none());
        assert!(index_route(EventType::ValidPreparationInstrumentCreated).is_none());
    }

    #[test]
    fn selectors_read_the_matching_slot() {
        let mut msg = DataChangeMessage::new(EventType::RecipeArchived);
        let route = index_route(EventType::RecipeArchived).unwrap();
        assert_eq!((route.selector)(&msg), None);

        msg.recipe = Some(Recipe {
            id: "R1".into(),
            ..Default::default()
        });
        assert_eq!((route.selector)(&msg), Some("R1"));

        let mut vessel = DataChangeMessage::new(EventType::ValidVesselCreated);
        vessel.valid_vessel = Some(ValidVessel {
            id: "V1".into(),
            ..Default::default()
        });
        let route = index_route(EventType::ValidVesselCreated).unwrap();
        assert_eq!((route.selector)(&vessel), Some("V1"));
    }

    #[test]
    fn user_selector_falls_back_to_actor() {
        let msg = DataChangeMessage::new(EventType::UserSignedUp).with_user_id("U1");
        let route = index_route(EventType::UserSignedUp).unwrap();
        assert_eq!((route.selector)(&msg), Some("U1"));
    }
}
