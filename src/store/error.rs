use thiserror::Error;

/// Result type alias for parameter store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Conditions a parameter store reports back to its callers.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("parameter not found: {0}")]
    NotFound(String),

    /// The key already retains the maximum number of versions.
    #[error("parameter {0} has reached its version history limit")]
    VersionLimitExceeded(String),

    /// Another writer holds the key; the write was rejected.
    #[error("too many concurrent updates to parameter {0}")]
    TooManyUpdates(String),

    #[error("parameter store error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}
