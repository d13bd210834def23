use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{StoreError, StoreResult};

/// String key-value storage with local-storage semantics.
///
/// Every call may fail (quota, private mode, unwritable file); callers are
/// expected to degrade to in-memory state rather than propagate.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> StoreResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> StoreResult<()>;
    fn remove(&self, key: &str) -> StoreResult<()>;
}

/// Read and decode `key`, substituting the default for missing, unreadable,
/// or corrupt payloads.
pub fn load_json_or_default<T>(store: &dyn KeyValueStore, key: &str) -> T
where
    T: DeserializeOwned + Default,
{
    let raw = match store.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return T::default(),
        Err(e) => {
            tracing::warn!("Failed to read {key} from storage: {e}");
            return T::default();
        }
    };
    match serde_json::from_str(&raw) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!("Discarding corrupt {key} payload: {e}");
            T::default()
        }
    }
}

/// Encode and write `value` under `key`. Returns false (after logging) when
/// the write did not reach storage.
pub fn persist_json<T: Serialize>(store: &dyn KeyValueStore, key: &str, value: &T) -> bool {
    let result = serde_json::to_string(value)
        .map_err(StoreError::from)
        .and_then(|json| store.set(key, &json));
    match result {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!("Failed to persist {key}: {e}");
            false
        }
    }
}
