//! Outbound email selection for data-change events.
//!
//! | Event                                | Email                          |
//! |--------------------------------------|--------------------------------|
//! | `user.signed_up`                     | verify email address           |
//! | `user.email_verification_requested`  | verify email address           |
//! | `meal_plan.created`                  | one per verified member        |
//! | `password_reset_token.created`       | password reset link            |
//! | `username_reminder.requested`        | username reminder              |
//! | `password_reset_token.redeemed`      | reset confirmation             |
//! | `password.changed`                   | change confirmation            |
//! | `household_invitation.created`       | invitation to the invitee      |
//!
//! The actor (`user_id`) is loaded first and nothing is sent unless their
//! address is verified. Meal-plan emails also skip unverified members.

use std::sync::Arc;

use ddb_core::{CoreError, EnvironmentConfig, EventType};
use ddb_db::{DataManager, DbError};
use ddb_messaging::Publisher;

use crate::emails::EmailRenderer;
use crate::messages::{DataChangeMessage, OutboundEmailMessage};

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("Failed to load notification data: {0}")]
    Data(#[from] DbError),

    #[error("No email environment configured: {0}")]
    Environment(#[from] CoreError),
}

// ---------------------------------------------------------------------------
// Selection
// ---------------------------------------------------------------------------

/// The kinds of email an event can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailKind {
    VerifyEmailAddress,
    MealPlanCreated,
    PasswordReset,
    UsernameReminder,
    PasswordResetConfirmation,
    PasswordChanged,
    HouseholdInvitation,
}

impl EmailKind {
    /// Which email, if any, `event_type` produces.
    pub fn for_event(event_type: EventType) -> Option<Self> {
        match event_type {
            EventType::UserSignedUp | EventType::EmailVerificationRequested => Some(Self::VerifyEmailAddress),
            EventType::MealPlanCreated => Some(Self::MealPlanCreated),
            EventType::PasswordResetTokenCreated => Some(Self::PasswordReset),
            EventType::UsernameReminderRequested => Some(Self::UsernameReminder),
            EventType::PasswordResetTokenRedeemed => Some(Self::PasswordResetConfirmation),
            EventType::PasswordChanged => Some(Self::PasswordChanged),
            EventType::HouseholdInvitationCreated => Some(Self::HouseholdInvitation),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// NotificationDispatcher
// ---------------------------------------------------------------------------

pub struct NotificationDispatcher {
    data: Arc<dyn DataManager>,
    publisher: Arc<dyn Publisher>,
    environment: String,
}

impl NotificationDispatcher {
    /// `environment` names the deployment whose branding and links the emails
    /// use (see [`EnvironmentConfig::for_environment`]).
    pub fn new(data: Arc<dyn DataManager>, publisher: Arc<dyn Publisher>, environment: impl Into<String>) -> Self {
        Self {
            data,
            publisher,
            environment: environment.into(),
        }
    }

    /// Build and publish the emails for `msg`. Returns how many were
    /// published; individual publish failures are logged and skipped.
    pub async fn dispatch(&self, msg: &DataChangeMessage) -> Result<usize, NotificationError> {
        let emails = self.emails_for(msg).await?;
        let mut published = 0;
        for email in &emails {
            match self.publisher.publish(email).await {
                Ok(()) => published += 1,
                Err(e) => tracing::error!(
                    event_type = %msg.event_type,
                    user_id = %email.user_id,
                    error = %e,
                    "Failed to publish outbound email"
                ),
            }
        }
        Ok(published)
    }

    /// Decide which emails `msg` produces, without publishing them.
    pub async fn emails_for(&self, msg: &DataChangeMessage) -> Result<Vec<OutboundEmailMessage>, NotificationError> {
        let Some(kind) = EmailKind::for_event(msg.event_type) else {
            return Ok(Vec::new());
        };
        if msg.user_id.is_empty() {
            tracing::warn!(event_type = %msg.event_type, "Notification event has no user_id, skipping emails");
            return Ok(Vec::new());
        }

        let user = self.data.get_user(&msg.user_id).await?;
        if !user.is_email_verified() {
            tracing::debug!(user_id = %user.id, event_type = %msg.event_type, "User email not verified, skipping");
            return Ok(Vec::new());
        }

        let renderer = EmailRenderer::new(EnvironmentConfig::require(&self.environment)?);

        let emails = match kind {
            EmailKind::VerifyEmailAddress => match msg.email_verification_token.as_deref() {
                Some(token) if !token.is_empty() => vec![renderer.verify_email_address(&user, token)],
                _ => {
                    missing_payload(msg, "email_verification_token");
                    Vec::new()
                }
            },
            EmailKind::MealPlanCreated => {
                let Some(meal_plan) = &msg.meal_plan else {
                    missing_payload(msg, "meal_plan");
                    return Ok(Vec::new());
                };
                let household_id = if meal_plan.household_id.is_empty() {
                    &msg.household_id
                } else {
                    &meal_plan.household_id
                };
                self.data
                    .get_household_members(household_id)
                    .await?
                    .iter()
                    .filter(|member| member.is_email_verified())
                    .map(|member| renderer.meal_plan_created(member, meal_plan))
                    .collect()
            }
            EmailKind::PasswordReset => match &msg.password_reset_token {
                Some(token) => vec![renderer.password_reset(&user, token)],
                None => {
                    missing_payload(msg, "password_reset_token");
                    Vec::new()
                }
            },
            EmailKind::UsernameReminder => vec![renderer.username_reminder(&user)],
            EmailKind::PasswordResetConfirmation => vec![renderer.password_reset_confirmation(&user)],
            EmailKind::PasswordChanged => vec![renderer.password_changed(&user)],
            EmailKind::HouseholdInvitation => match &msg.household_invitation {
                Some(invitation) => vec![renderer.household_invitation(invitation, &user)],
                None => {
                    missing_payload(msg, "household_invitation");
                    Vec::new()
                }
            },
        };

        Ok(emails)
    }
}

fn missing_payload(msg: &DataChangeMessage, slot: &str) {
    tracing::warn!(
        event_type = %msg.event_type,
        slot,
        "Required payload missing from notification event, skipping emails"
    );
}
