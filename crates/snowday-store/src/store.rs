//! Storage trait and typed JSON helpers.

use serde::de::DeserializeOwned;
use serde::Serialize;
use snowday_core::StorageError;

/// Result type for storage operations.
pub type StoreResult<T> = Result<T, StorageError>;

/// Minimal persisted key-value store.
///
/// No transactional guarantees beyond single-key atomicity. Writers in other
/// processes can interleave with a read-modify-write here and lose an update.
pub trait KeyValueStore: Send + Sync {
    /// Fetch the raw value for `key`, or `None` when absent.
    fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Insert or replace the value for `key`.
    fn put(&self, key: &str, value: &str) -> StoreResult<()>;

    /// Remove `key`. Removing an absent key is not an error.
    fn delete(&self, key: &str) -> StoreResult<()>;
}

/// JSON encoding on top of any [`KeyValueStore`].
pub trait JsonStoreExt {
    /// Read and decode the value at `key`.
    ///
    /// # Errors
    /// Returns `StorageError::Serialization` when the stored text is not valid
    /// JSON for `T`, or whatever the underlying store reports.
    fn get_json<T: DeserializeOwned>(&self, key: &str) -> StoreResult<Option<T>>;

    /// Encode and write `value` at `key`.
    ///
    /// # Errors
    /// Propagates encoding and storage failures.
    fn put_json<T: Serialize>(&self, key: &str, value: &T) -> StoreResult<()>;
}

impl<S: KeyValueStore + ?Sized> JsonStoreExt for S {
    fn get_json<T: DeserializeOwned>(&self, key: &str) -> StoreResult<Option<T>> {
        match self.get(key)? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    fn put_json<T: Serialize>(&self, key: &str, value: &T) -> StoreResult<()> {
        let raw = serde_json::to_string(value)?;
        self.put(key, &raw)
    }
}
