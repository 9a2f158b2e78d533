//! Logical topic names. Every body on every topic is JSON.

/// `DataChangeMessage`s written by the API.
pub const DATA_CHANGES: &str = "data_changes";

/// `WebhookExecutionRequest`s produced by the fan-out.
pub const WEBHOOK_EXECUTION_REQUESTS: &str = "webhook_execution_requests";

/// `OutboundEmailMessage`s produced by the fan-out.
pub const OUTBOUND_EMAILS: &str = "outbound_emails";

/// `IndexRequest`s produced by the fan-out and the index scheduler.
pub const SEARCH_INDEX_REQUESTS: &str = "search_index_requests";

/// `UserDataAggregationRequest`s written by the API.
pub const USER_DATA_AGGREGATION: &str = "user_data_aggregation";

pub const ALL: &[&str] = &[
    DATA_CHANGES,
    WEBHOOK_EXECUTION_REQUESTS,
    OUTBOUND_EMAILS,
    SEARCH_INDEX_REQUESTS,
    USER_DATA_AGGREGATION,
];
