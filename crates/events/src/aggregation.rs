//! User data exports.
//!
//! Consumes `user_data_aggregation` requests, collects everything the
//! datastore holds about the user, and writes it as pretty-printed JSON to
//! `<report_id>.json` in the object store.

use std::sync::Arc;

use async_trait::async_trait;
use ddb_db::{DataManager, DbError};
use ddb_messaging::{decode, HandlerError, MessageHandler};

use crate::messages::UserDataAggregationRequest;
use crate::storage::{ObjectStore, StorageError};

#[derive(Debug, thiserror::Error)]
pub enum AggregationError {
    #[error("Aggregation request is missing {0}")]
    Invalid(&'static str),

    #[error("Failed to aggregate user data: {0}")]
    Data(#[from] DbError),

    #[error("Failed to encode user data: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Failed to store user data: {0}")]
    Storage(#[from] StorageError),
}

pub struct UserDataAggregator {
    data: Arc<dyn DataManager>,
    store: Arc<dyn ObjectStore>,
}

impl UserDataAggregator {
    pub fn new(data: Arc<dyn DataManager>, store: Arc<dyn ObjectStore>) -> Self {
        Self { data, store }
    }

    /// Build and store one export. Returns the object key written.
    #[tracing::instrument(skip_all, fields(report_id = %request.report_id, user_id = %request.user_id))]
    pub async fn aggregate(&self, request: &UserDataAggregationRequest) -> Result<String, AggregationError> {
        if request.report_id.trim().is_empty() {
            return Err(AggregationError::Invalid("report_id"));
        }
        if request.user_id.trim().is_empty() {
            return Err(AggregationError::Invalid("user_id"));
        }

        let collection = self.data.aggregate_user_data(&request.user_id).await?;
        let bytes = serde_json::to_vec_pretty(&collection)?;
        let key = format!("{}.json", request.report_id);
        self.store.save(&key, "application/json", bytes).await?;

        tracing::info!(key = %key, "User data export written");
        Ok(key)
    }
}

#[async_trait]
impl MessageHandler for UserDataAggregator {
    async fn handle(&self, payload: &[u8]) -> Result<(), HandlerError> {
        let request: UserDataAggregationRequest = decode(payload)?;
        match self.aggregate(&request).await {
            Ok(_) => Ok(()),
            // Redelivering the same bytes cannot fix a malformed request.
            Err(AggregationError::Invalid(field)) => {
                tracing::warn!(field, "Dropping invalid user data aggregation request");
                Ok(())
            }
            Err(AggregationError::Storage(StorageError::InvalidKey(key))) => {
                tracing::warn!(key = %key, "Dropping user data aggregation request with unusable report id");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}
