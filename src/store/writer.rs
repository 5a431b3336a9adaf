use super::backend::ParameterStore;
use super::error::{StoreError, StoreResult};
use super::models::PutOutcome;

/// Overwrite a parameter, recovering from an exhausted version history.
///
/// A key that has run out of retained versions is deleted and written again
/// exactly once; if that second write fails the error is returned. A busy store
/// drops the write and reports [`PutOutcome::Dropped`].
pub async fn put_parameter(
    store: &dyn ParameterStore,
    key: &str,
    value: &str,
    encrypted: bool,
) -> StoreResult<PutOutcome> {
    match store.put(key, value, encrypted).await {
        Ok(version) => Ok(PutOutcome::Written { version }),
        Err(StoreError::VersionLimitExceeded(_)) => {
            tracing::info!(key = %key, "Version history exhausted, recreating parameter");
            match store.delete(key).await {
                Ok(()) | Err(StoreError::NotFound(_)) => {}
                Err(e) => return Err(e),
            }
            match store.put(key, value, encrypted).await {
                Ok(version) => Ok(PutOutcome::Written { version }),
                Err(StoreError::TooManyUpdates(_)) => Ok(dropped(key)),
                Err(e) => Err(e),
            }
        }
        Err(StoreError::TooManyUpdates(_)) => Ok(dropped(key)),
        Err(e) => Err(e),
    }
}

fn dropped(key: &str) -> PutOutcome {
    tracing::warn!(key = %key, "Parameter store busy, write dropped");
    PutOutcome::Dropped
}
