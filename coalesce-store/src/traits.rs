//! KeyValueStore trait definition.

use async_trait::async_trait;

use crate::error::StoreResult;

/// Asynchronous string-keyed store
///
/// Implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait KeyValueStore<V>: Send + Sync + 'static {
    /// Gets the value stored under `key`, if any.
    async fn get(&self, key: &str) -> StoreResult<Option<V>>;

    /// Stores `value` under `key`, replacing any previous value.
    async fn set(&self, key: &str, value: V) -> StoreResult<()>;

    /// Removes `key`, returning the value it held.
    async fn remove(&self, key: &str) -> StoreResult<Option<V>>;

    /// Number of stored entries.
    async fn len(&self) -> StoreResult<usize>;

    /// Whether the store holds no entries.
    async fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len().await? == 0)
    }
}
