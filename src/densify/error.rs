use thiserror::Error;

use crate::store::StoreError;

/// Failures talking to the optimization service. Callers fold these into typed
/// outcomes; they never abort a lifecycle event on their own.
#[derive(Debug, Clone, Error)]
pub enum ServiceError {
    /// Transport failure, unknown host or failed health check.
    #[error("service unreachable: {0}")]
    Unreachable(String),

    #[error("authorization failed: {0}")]
    AuthFailure(String),

    /// Missing or error-flagged account or recommendation data.
    #[error("retrieval failed: {0}")]
    RetrievalFailure(String),

    #[error("malformed service response: {0}")]
    Parse(String),
}

/// Failures loading the stored connection info.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("Could not find parameter with Densify information {0}")]
    Missing(String),

    #[error("Could not parse Densify connection info from parameter {key}: {reason}")]
    Parse { key: String, reason: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}
