#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Unknown event type: {0}")]
    UnknownEventType(String),

    #[error("Unknown index type: {0}")]
    UnknownIndexType(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Invalid signing secret: {0}")]
    InvalidSecret(String),

    #[error("Unknown environment: {0}")]
    UnknownEnvironment(String),
}
