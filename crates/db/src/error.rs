/// Error type for datastore reads and writes.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// The row does not exist or is archived.
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: String },

    /// The query itself failed (connection, timeout, decoding).
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),
}

impl DbError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// `true` for "no rows" outcomes, which callers usually treat as
    /// nothing to do rather than as a failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::Sqlx(sqlx::Error::RowNotFound))
    }
}
