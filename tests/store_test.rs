use std::sync::Mutex;

use async_trait::async_trait;
use densify_recommendation::store::{
    put_parameter, ParameterStore, PutOutcome, SqliteParameterStore, StoreError, StoreResult,
};
use tempfile::TempDir;

fn create_test_store(max_versions: u64) -> (TempDir, SqliteParameterStore) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("params.db");
    let store = SqliteParameterStore::open(path.to_str().unwrap())
        .unwrap()
        .with_max_versions(max_versions);
    store.initialize().unwrap();
    (dir, store)
}

#[tokio::test]
async fn test_initialize_is_idempotent() {
    let (_dir, store) = create_test_store(10);
    // Should not error on second init
    store.initialize().unwrap();
}

#[tokio::test]
async fn test_put_get_overwrites() {
    let (_dir, store) = create_test_store(10);

    assert_eq!(store.put("k", "one", false).await.unwrap(), 1);
    assert_eq!(store.put("k", "two", true).await.unwrap(), 2);
    assert_eq!(store.get("k").await.unwrap(), "two");

    let parameter = store.get_parameter("k").unwrap();
    assert_eq!(parameter.version, 2);
    assert!(parameter.secure);
    assert_eq!(store.retained_versions("k").unwrap(), 2);
}

#[tokio::test]
async fn test_get_missing_is_not_found() {
    let (_dir, store) = create_test_store(10);
    let err = store.get("missing").await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_delete_missing_is_not_found() {
    let (_dir, store) = create_test_store(10);
    store.put("k", "v", false).await.unwrap();

    store.delete("k").await.unwrap();
    assert!(matches!(
        store.delete("k").await,
        Err(StoreError::NotFound(_))
    ));
    assert_eq!(store.retained_versions("k").unwrap(), 0);
}

#[tokio::test]
async fn test_delete_clears_history_with_value() {
    let (_dir, store) = create_test_store(10);
    store.put("k", "a", false).await.unwrap();
    store.put("k", "b", false).await.unwrap();
    store.put("other", "x", false).await.unwrap();

    store.delete("k").await.unwrap();
    assert!(store.get_parameter("k").unwrap_err().is_not_found());
    assert_eq!(store.retained_versions("k").unwrap(), 0);
    // Other keys keep their history
    assert_eq!(store.retained_versions("other").unwrap(), 1);

    // A recreated key starts a fresh history
    assert_eq!(store.put("k", "c", false).await.unwrap(), 1);
    assert_eq!(store.retained_versions("k").unwrap(), 1);
}

#[tokio::test]
async fn test_version_limit_rejects_raw_put() {
    let (_dir, store) = create_test_store(2);
    store.put("k", "a", false).await.unwrap();
    store.put("k", "b", false).await.unwrap();

    let err = store.put("k", "c", false).await.unwrap_err();
    assert!(matches!(err, StoreError::VersionLimitExceeded(_)));
    assert_eq!(store.get("k").await.unwrap(), "b");
}

#[tokio::test]
async fn test_put_parameter_recreates_exhausted_key() {
    let (_dir, store) = create_test_store(2);
    store.put("k", "a", false).await.unwrap();
    store.put("k", "b", false).await.unwrap();

    let outcome = put_parameter(&store, "k", "c", false).await.unwrap();
    assert_eq!(outcome, PutOutcome::Written { version: 1 });
    assert_eq!(store.get("k").await.unwrap(), "c");
    assert_eq!(store.retained_versions("k").unwrap(), 1);
}

#[tokio::test]
async fn test_list_by_prefix() {
    let (_dir, store) = create_test_store(10);
    store.put("Densify_Recommendation_vm-1", "{}", false).await.unwrap();
    store.put("Densify_Recommendation_vm-2", "{}", false).await.unwrap();
    store.put("DensifyConnection", "{}", true).await.unwrap();

    let recs = store.list("Densify_Recommendation_").unwrap();
    let names: Vec<&str> = recs.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(
        names,
        vec!["Densify_Recommendation_vm-1", "Densify_Recommendation_vm-2"]
    );
    assert_eq!(store.list("").unwrap().len(), 3);
}

// ─── Write choreography against scripted stores ─────────────────────────────

/// Replays scripted `put` results; `delete` always succeeds.
struct ScriptedStore {
    puts: Mutex<Vec<StoreResult<u64>>>,
    deletes: Mutex<u32>,
}

impl ScriptedStore {
    fn new(mut puts: Vec<StoreResult<u64>>) -> Self {
        puts.reverse();
        Self {
            puts: Mutex::new(puts),
            deletes: Mutex::new(0),
        }
    }

    fn deletes(&self) -> u32 {
        *self.deletes.lock().unwrap()
    }

    fn remaining_puts(&self) -> usize {
        self.puts.lock().unwrap().len()
    }
}

#[async_trait]
impl ParameterStore for ScriptedStore {
    async fn get(&self, key: &str) -> StoreResult<String> {
        Err(StoreError::NotFound(key.to_string()))
    }

    async fn put(&self, _key: &str, _value: &str, _encrypted: bool) -> StoreResult<u64> {
        self.puts.lock().unwrap().pop().expect("unexpected put")
    }

    async fn delete(&self, _key: &str) -> StoreResult<()> {
        *self.deletes.lock().unwrap() += 1;
        Ok(())
    }
}

#[tokio::test]
async fn test_busy_store_drops_write() {
    let store = ScriptedStore::new(vec![Err(StoreError::TooManyUpdates("k".into()))]);
    let outcome = put_parameter(&store, "k", "v", false).await.unwrap();
    assert_eq!(outcome, PutOutcome::Dropped);
    assert_eq!(store.deletes(), 0);
}

#[tokio::test]
async fn test_version_limit_retries_exactly_once() {
    let store = ScriptedStore::new(vec![
        Err(StoreError::VersionLimitExceeded("k".into())),
        Err(StoreError::VersionLimitExceeded("k".into())),
        Ok(9),
    ]);

    let err = put_parameter(&store, "k", "v", false).await.unwrap_err();
    assert!(matches!(err, StoreError::VersionLimitExceeded(_)));
    assert_eq!(store.deletes(), 1);
    // The third scripted result was never consumed
    assert_eq!(store.remaining_puts(), 1);
}

#[tokio::test]
async fn test_version_limit_retry_busy_is_dropped() {
    let store = ScriptedStore::new(vec![
        Err(StoreError::VersionLimitExceeded("k".into())),
        Err(StoreError::TooManyUpdates("k".into())),
    ]);

    let outcome = put_parameter(&store, "k", "v", true).await.unwrap();
    assert_eq!(outcome, PutOutcome::Dropped);
    assert_eq!(store.deletes(), 1);
}

#[tokio::test]
async fn test_backend_error_propagates() {
    let store = ScriptedStore::new(vec![Err(StoreError::Backend("disk full".into()))]);
    let err = put_parameter(&store, "k", "v", false).await.unwrap_err();
    assert!(err.to_string().contains("disk full"));
}
