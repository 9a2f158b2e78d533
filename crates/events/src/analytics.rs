//! Product analytics sink.
//!
//! The fan-out reports every event with an actor to an [`EventReporter`].
//! Reporting is best-effort: callers log failures and move on.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use ddb_core::EventType;

const SEGMENT_API_URL: &str = "https://api.segment.io/v1";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

pub type Properties = HashMap<String, serde_json::Value>;

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum AnalyticsError {
    #[error("Analytics request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Analytics API returned HTTP {0}")]
    HttpStatus(u16),
}

// ---------------------------------------------------------------------------
// EventReporter
// ---------------------------------------------------------------------------

#[async_trait]
pub trait EventReporter: Send + Sync {
    /// Register a newly signed-up user.
    async fn add_user(&self, user_id: &str, properties: &Properties) -> Result<(), AnalyticsError>;

    /// Record that `user_id` caused `event_type`.
    async fn event_occurred(
        &self,
        event_type: EventType,
        user_id: &str,
        properties: &Properties,
    ) -> Result<(), AnalyticsError>;
}

/// Discards everything. Used when no analytics key is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopEventReporter;

#[async_trait]
impl EventReporter for NoopEventReporter {
    async fn add_user(&self, _user_id: &str, _properties: &Properties) -> Result<(), AnalyticsError> {
        Ok(())
    }

    async fn event_occurred(
        &self,
        _event_type: EventType,
        _user_id: &str,
        _properties: &Properties,
    ) -> Result<(), AnalyticsError> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Segment
// ---------------------------------------------------------------------------

/// Reports to the Segment HTTP tracking API (`identify` and `track`).
pub struct SegmentEventReporter {
    client: reqwest::Client,
    base_url: String,
    write_key: String,
}

impl SegmentEventReporter {
    pub fn new(write_key: impl Into<String>) -> Self {
        Self::with_base_url(write_key, SEGMENT_API_URL)
    }

    pub fn with_base_url(write_key: impl Into<String>, base_url: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("Failed to build reqwest HTTP client");
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            write_key: write_key.into(),
        }
    }

    async fn post(&self, path: &str, body: serde_json::Value) -> Result<(), AnalyticsError> {
        let response = self
            .client
            .post(format!("{}/{path}", self.base_url))
            .basic_auth(&self.write_key, Some(""))
            .json(&body)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(AnalyticsError::HttpStatus(response.status().as_u16()));
        }
        Ok(())
    }
}

#[async_trait]
impl EventReporter for SegmentEventReporter {
    async fn add_user(&self, user_id: &str, properties: &Properties) -> Result<(), AnalyticsError> {
        self.post(
            "identify",
            serde_json::json!({ "userId": user_id, "traits": properties }),
        )
        .await
    }

    async fn event_occurred(
        &self,
        event_type: EventType,
        user_id: &str,
        properties: &Properties,
    ) -> Result<(), AnalyticsError> {
        self.post(
            "track",
            serde_json::json!({
                "userId": user_id,
                "event": event_type.as_str(),
                "properties": properties,
            }),
        )
        .await
    }
}

/// Pick a reporter from `SEGMENT_WRITE_KEY`; no key means [`NoopEventReporter`].
pub fn reporter_from_env() -> std::sync::Arc<dyn EventReporter> {
    match std::env::var("SEGMENT_WRITE_KEY") {
        Ok(key) if !key.trim().is_empty() => std::sync::Arc::new(SegmentEventReporter::new(key)),
        _ => std::sync::Arc::new(NoopEventReporter),
    }
}
