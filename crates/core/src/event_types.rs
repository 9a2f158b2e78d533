//! The closed set of event types produced by the API.
//!
//! Every [`EventType`] belongs to exactly one [`EventClass`]. The class
//! decides which fan-out pipelines an event may reach: user-lifecycle events
//! never trigger tenant webhooks.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Partition of event types used for dispatch decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventClass {
    /// Create/update/archive of a domain entity.
    DataTouching,
    /// Account, session, and credential changes of a user.
    UserLifecycle,
    /// Events that exist to notify someone (tokens, reminders, invitations).
    Notification,
}

macro_rules! event_types {
    ($($variant:ident => $name:literal,)+) => {
        /// A domain event type, serialized as its dotted name.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub enum EventType {
            $($variant,)+
        }

        impl EventType {
            /// Every known event type, in declaration order.
            pub const ALL: &'static [EventType] = &[$(EventType::$variant,)+];

            /// The dotted wire name, e.g. `"recipe.created"`.
            pub fn as_str(self) -> &'static str {
                match self {
                    $(EventType::$variant => $name,)+
                }
            }
        }

        impl FromStr for EventType {
            type Err = CoreError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($name => Ok(EventType::$variant),)+
                    other => Err(CoreError::UnknownEventType(other.to_string())),
                }
            }
        }
    };
}

event_types! {
    // -- households ------------------------------------------------------
    HouseholdCreated => "household.created",
    HouseholdUpdated => "household.updated",
    HouseholdArchived => "household.archived",
    HouseholdInvitationAccepted => "household_invitation.accepted",
    HouseholdInvitationCanceled => "household_invitation.canceled",
    HouseholdInvitationRejected => "household_invitation.rejected",
    // -- webhooks --------------------------------------------------------
    WebhookCreated => "webhook.created",
    WebhookArchived => "webhook.archived",
    // -- recipes and meals -----------------------------------------------
    RecipeCreated => "recipe.created",
    RecipeUpdated => "recipe.updated",
    RecipeArchived => "recipe.archived",
    MealCreated => "meal.created",
    MealUpdated => "meal.updated",
    MealArchived => "meal.archived",
    MealPlanUpdated => "meal_plan.updated",
    MealPlanArchived => "meal_plan.archived",
    MealPlanFinalized => "meal_plan.finalized",
    // -- reference data --------------------------------------------------
    ValidIngredientCreated => "valid_ingredient.created",
    ValidIngredientUpdated => "valid_ingredient.updated",
    ValidIngredientArchived => "valid_ingredient.archived",
    ValidInstrumentCreated => "valid_instrument.created",
    ValidInstrumentUpdated => "valid_instrument.updated",
    ValidInstrumentArchived => "valid_instrument.archived",
    ValidMeasurementUnitCreated => "valid_measurement_unit.created",
    ValidMeasurementUnitUpdated => "valid_measurement_unit.updated",
    ValidMeasurementUnitArchived => "valid_measurement_unit.archived",
    ValidPreparationCreated => "valid_preparation.created",
    ValidPreparationUpdated => "valid_preparation.updated",
    ValidPreparationArchived => "valid_preparation.archived",
    ValidIngredientStateCreated => "valid_ingredient_state.created",
    ValidIngredientStateUpdated => "valid_ingredient_state.updated",
    ValidIngredientStateArchived => "valid_ingredient_state.archived",
    ValidIngredientMeasurementUnitCreated => "valid_ingredient_measurement_unit.created",
    ValidIngredientMeasurementUnitUpdated => "valid_ingredient_measurement_unit.updated",
    ValidIngredientMeasurementUnitArchived => "valid_ingredient_measurement_unit.archived",
    ValidPreparationInstrumentCreated => "valid_preparation_instrument.created",
    ValidPreparationInstrumentUpdated => "valid_preparation_instrument.updated",
    ValidPreparationInstrumentArchived => "valid_preparation_instrument.archived",
    ValidIngredientPreparationCreated => "valid_ingredient_preparation.created",
    ValidIngredientPreparationUpdated => "valid_ingredient_preparation.updated",
    ValidIngredientPreparationArchived => "valid_ingredient_preparation.archived",
    ValidVesselCreated => "valid_vessel.created",
    ValidVesselUpdated => "valid_vessel.updated",
    ValidVesselArchived => "valid_vessel.archived",
    // -- user lifecycle --------------------------------------------------
    UserSignedUp => "user.signed_up",
    UserEmailAddressVerified => "user.email_address_verified",
    UserArchived => "user.archived",
    PasswordChanged => "password.changed",
    TwoFactorSecretChanged => "two_factor_secret.changed",
    TwoFactorSecretVerified => "two_factor_secret.verified",
    UserLoggedIn => "user.logged_in",
    UserLoggedOut => "user.logged_out",
    UserChangedActiveHousehold => "user.changed_active_household",
    HouseholdOwnershipTransferred => "household.ownership_transferred",
    HouseholdMemberPermissionsChanged => "household.member_permissions_changed",
    OAuth2ClientCreated => "oauth2_client.created",
    OAuth2ClientArchived => "oauth2_client.archived",
    // -- notifications ---------------------------------------------------
    PasswordResetTokenCreated => "password_reset_token.created",
    PasswordResetTokenRedeemed => "password_reset_token.redeemed",
    UsernameReminderRequested => "username_reminder.requested",
    HouseholdInvitationCreated => "household_invitation.created",
    MealPlanCreated => "meal_plan.created",
    EmailVerificationRequested => "user.email_verification_requested",
}

/// Event types that never reach tenant webhooks.
///
/// Hand-curated: `household.archived` is deliberately absent and therefore
/// still dispatched to webhooks.
pub const USER_LIFECYCLE_EVENT_TYPES: &[EventType] = &[
    EventType::UserSignedUp,
    EventType::UserEmailAddressVerified,
    EventType::UserArchived,
    EventType::PasswordChanged,
    EventType::TwoFactorSecretChanged,
    EventType::TwoFactorSecretVerified,
    EventType::UserLoggedIn,
    EventType::UserLoggedOut,
    EventType::UserChangedActiveHousehold,
    EventType::HouseholdOwnershipTransferred,
    EventType::HouseholdMemberPermissionsChanged,
    EventType::OAuth2ClientCreated,
    EventType::OAuth2ClientArchived,
];

/// Event types whose purpose is to notify a person.
pub const NOTIFICATION_EVENT_TYPES: &[EventType] = &[
    EventType::PasswordResetTokenCreated,
    EventType::PasswordResetTokenRedeemed,
    EventType::UsernameReminderRequested,
    EventType::HouseholdInvitationCreated,
    EventType::MealPlanCreated,
    EventType::EmailVerificationRequested,
];

impl EventType {
    /// The dispatch class this event type belongs to.
    pub fn class(self) -> EventClass {
        if USER_LIFECYCLE_EVENT_TYPES.contains(&self) {
            EventClass::UserLifecycle
        } else if NOTIFICATION_EVENT_TYPES.contains(&self) {
            EventClass::Notification
        } else {
            EventClass::DataTouching
        }
    }

    /// Whether tenant webhooks may be fired for this event type.
    pub fn triggers_webhooks(self) -> bool {
        self.class() != EventClass::UserLifecycle
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for EventType {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<EventType> for String {
    fn from(value: EventType) -> Self {
        value.as_str().to_string()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn wire_names_are_unique_and_parse_back() {
        let mut seen = HashSet::new();
        for event_type in EventType::ALL {
            assert!(seen.insert(event_type.as_str()), "duplicate {event_type}");
            assert_eq!(event_type.as_str().parse::<EventType>().unwrap(), *event_type);
        }
    }

    #[test]
    fn unknown_name_is_rejected() {
        assert_matches!(
            "recipe.exploded".parse::<EventType>(),
            Err(CoreError::UnknownEventType(name)) if name == "recipe.exploded"
        );
    }

    #[test]
    fn serializes_as_dotted_string() {
        let json = serde_json::to_string(&EventType::RecipeCreated).unwrap();
        assert_eq!(json, "\"recipe.created\"");

        let parsed: EventType = serde_json::from_str("\"user.signed_up\"").unwrap();
        assert_eq!(parsed, EventType::UserSignedUp);

        assert!(serde_json::from_str::<EventType>("\"nope\"").is_err());
    }

    #[test]
    fn classes_are_disjoint() {
        for event_type in USER_LIFECYCLE_EVENT_TYPES {
            assert!(!NOTIFICATION_EVENT_TYPES.contains(event_type));
        }
    }

    #[test]
    fn user_lifecycle_events_do_not_trigger_webhooks() {
        assert!(!EventType::UserSignedUp.triggers_webhooks());
        assert!(!EventType::PasswordChanged.triggers_webhooks());
        assert!(!EventType::OAuth2ClientArchived.triggers_webhooks());
        assert!(EventType::RecipeCreated.triggers_webhooks());
        assert!(EventType::MealPlanCreated.triggers_webhooks());
    }

    #[test]
    fn household_archived_still_triggers_webhooks() {
        assert_eq!(EventType::HouseholdArchived.class(), EventClass::DataTouching);
        assert!(EventType::HouseholdArchived.triggers_webhooks());
    }

    #[test]
    fn notification_class_membership() {
        assert_eq!(
            EventType::PasswordResetTokenRedeemed.class(),
            EventClass::Notification
        );
        assert_eq!(EventType::ValidVesselArchived.class(), EventClass::DataTouching);
    }
}
