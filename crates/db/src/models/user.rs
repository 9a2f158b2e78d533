//! User and household models.

use ddb_core::types::{EntityId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// ---------------------------------------------------------------------------
// User
// ---------------------------------------------------------------------------

/// A row from the `users` table.
#[derive(Debug, Clone, Default, PartialEq, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: EntityId,
    pub username: String,
    pub email_address: String,
    pub first_name: String,
    pub last_name: String,
    pub email_address_verified_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub last_updated_at: Option<Timestamp>,
    pub archived_at: Option<Timestamp>,
}

impl User {
    /// Only users with a verified address ever receive email.
    pub fn is_email_verified(&self) -> bool {
        self.email_address_verified_at.is_some()
    }

    /// Display name for greetings; falls back to the username.
    pub fn full_name(&self) -> String {
        let full = format!("{} {}", self.first_name.trim(), self.last_name.trim());
        let full = full.trim();
        if full.is_empty() {
            self.username.clone()
        } else {
            full.to_string()
        }
    }
}

/// Projection of a user stored in the `users` search index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSearchSubset {
    pub id: EntityId,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email_address: String,
}

impl From<&User> for UserSearchSubset {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            username: user.username.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            email_address: user.email_address.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Household
// ---------------------------------------------------------------------------

/// A row from the `households` table.
///
/// **Note:** `webhook_hmac_secret` is never serialized, so households can
/// travel inside messages and data exports without leaking it.
#[derive(Debug, Clone, Default, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Household {
    pub id: EntityId,
    pub name: String,
    pub belongs_to_user: EntityId,
    /// Hex-encoded key used to sign outbound webhook bodies.
    #[serde(skip_serializing, default)]
    pub webhook_hmac_secret: String,
    pub created_at: Timestamp,
    pub last_updated_at: Option<Timestamp>,
    pub archived_at: Option<Timestamp>,
}
