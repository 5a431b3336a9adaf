use chrono::{DateTime, Duration, Utc};

use crate::store::{put_parameter, ParameterStore, PutOutcome, StoreError};

use super::policy::STALENESS_WINDOW_MINUTES;

/// What happened to the shared refresh marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerUpdate {
    /// The marker does not exist; its consumer has not created it.
    Missing,
    /// The marker was touched recently and was left alone.
    Current,
    Updated,
    /// The marker was due but the write or read did not go through.
    Skipped,
}

/// Bump the bulk-refresh marker to `now` if it is older than the staleness
/// window or unparseable. An absent marker is left absent.
pub async fn update_refresh_marker(
    store: &dyn ParameterStore,
    key: &str,
    now: DateTime<Utc>,
) -> MarkerUpdate {
    let raw = match store.get(key).await {
        Ok(raw) => raw,
        Err(StoreError::NotFound(_)) => {
            tracing::debug!(key = %key, "Refresh marker does not exist");
            return MarkerUpdate::Missing;
        }
        Err(e) => {
            tracing::warn!(key = %key, error = %e, "Failed to read refresh marker");
            return MarkerUpdate::Skipped;
        }
    };

    let due = match DateTime::parse_from_rfc3339(raw.trim()) {
        Ok(ts) => now > ts.with_timezone(&Utc) + Duration::minutes(STALENESS_WINDOW_MINUTES),
        Err(_) => {
            tracing::warn!(key = %key, "Refresh marker has incorrect time format");
            true
        }
    };
    if !due {
        return MarkerUpdate::Current;
    }

    tracing::info!(key = %key, "Updating refresh marker");
    match put_parameter(store, key, &now.to_rfc3339(), false).await {
        Ok(PutOutcome::Written { .. }) => MarkerUpdate::Updated,
        Ok(PutOutcome::Dropped) => MarkerUpdate::Skipped,
        Err(e) => {
            tracing::warn!(key = %key, error = %e, "Failed to update refresh marker");
            MarkerUpdate::Skipped
        }
    }
}
