//! Periodic datastore housekeeping.
//!
//! [`MaintenanceSweeper`] deletes OAuth2 client tokens whose every expiry
//! passed more than a day ago.

use std::sync::Arc;
use std::time::Duration;

use ddb_db::{DataManager, DbError};
use tokio_util::sync::CancellationToken;

/// Default time between sweeps.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

pub struct MaintenanceSweeper {
    data: Arc<dyn DataManager>,
}

impl MaintenanceSweeper {
    pub fn new(data: Arc<dyn DataManager>) -> Self {
        Self { data }
    }

    /// Run one sweep. Returns the number of tokens deleted.
    pub async fn sweep(&self) -> Result<u64, DbError> {
        let deleted = self.data.delete_expired_oauth2_client_tokens().await?;
        if deleted > 0 {
            tracing::info!(deleted, "Deleted expired OAuth2 client tokens");
        } else {
            tracing::debug!("No expired OAuth2 client tokens");
        }
        Ok(deleted)
    }

    /// Sweep every `period` until `cancel` fires.
    pub async fn run(&self, cancel: CancellationToken, period: Duration) {
        let mut interval = tokio::time::interval(period);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Maintenance sweeper cancelled");
                    break;
                }
                _ = interval.tick() => {
                    if let Err(e) = self.sweep().await {
                        tracing::error!(error = %e, "Maintenance sweep failed");
                    }
                }
            }
        }
    }
}
