use async_trait::async_trait;

use super::error::StoreResult;

/// Durable key/value parameter store.
///
/// Writes overwrite by key (last write wins). Implementations report expected
/// conditions through [`StoreError`](super::error::StoreError) variants rather
/// than opaque failures so callers can match on them.
#[async_trait]
pub trait ParameterStore: Send + Sync {
    /// Read the current value of a parameter.
    async fn get(&self, key: &str) -> StoreResult<String>;

    /// Write a parameter, overwriting any current value. Returns the new version.
    async fn put(&self, key: &str, value: &str, encrypted: bool) -> StoreResult<u64>;

    /// Remove a parameter and its version history.
    async fn delete(&self, key: &str) -> StoreResult<()>;
}
