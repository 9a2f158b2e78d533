/// Error type for search backend operations.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    /// The HTTP request to the backend failed (network, DNS, timeout).
    #[error("Search request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The backend answered with a non-2xx status.
    #[error("Search backend returned HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    /// A document or response body could not be (de)serialized.
    #[error("Search document encoding failed: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("Invalid search configuration: {0}")]
    Config(String),
}
