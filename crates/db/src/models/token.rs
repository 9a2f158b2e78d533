//! Invitation and credential-token models carried by notification events.

use ddb_core::types::{EntityId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `household_invitations` table.
#[derive(Debug, Clone, Default, PartialEq, FromRow, Serialize, Deserialize)]
pub struct HouseholdInvitation {
    pub id: EntityId,
    pub household_id: EntityId,
    pub from_user: EntityId,
    pub to_email: String,
    pub to_name: String,
    pub note: String,
    pub token: String,
    pub status: String,
    pub expires_at: Timestamp,
    pub created_at: Timestamp,
    pub last_updated_at: Option<Timestamp>,
    pub archived_at: Option<Timestamp>,
}

/// A row from the `password_reset_tokens` table.
#[derive(Debug, Clone, Default, PartialEq, FromRow, Serialize, Deserialize)]
pub struct PasswordResetToken {
    pub id: EntityId,
    pub token: String,
    pub belongs_to_user: EntityId,
    pub expires_at: Timestamp,
    pub redeemed_at: Option<Timestamp>,
    pub created_at: Timestamp,
}
