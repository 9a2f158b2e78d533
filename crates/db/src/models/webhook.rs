//! Tenant webhook models.

use ddb_core::types::{EntityId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

pub const CONTENT_TYPE_JSON: &str = "application/json";
pub const CONTENT_TYPE_XML: &str = "application/xml";

/// A row from the `webhooks` table.
#[derive(Debug, Clone, Default, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Webhook {
    pub id: EntityId,
    pub name: String,
    pub household_id: EntityId,
    pub url: String,
    /// HTTP method used for delivery, e.g. `POST`.
    pub method: String,
    /// One of [`CONTENT_TYPE_JSON`] or [`CONTENT_TYPE_XML`].
    pub content_type: String,
    pub created_at: Timestamp,
    pub last_updated_at: Option<Timestamp>,
    pub archived_at: Option<Timestamp>,
}

impl Webhook {
    pub fn is_archived(&self) -> bool {
        self.archived_at.is_some()
    }
}
