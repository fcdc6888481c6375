//! Key-value state store trait definition.

use async_trait::async_trait;
use content_indexer_shared::StateValue;

use crate::errors::StateError;

/// Durable key-value storage for pipeline state.
///
/// Implementations prefix every key with their namespace.
#[async_trait]
pub trait StateStore: Send + Sync {
    async fn save(&self, key: &str, value: &StateValue) -> Result<(), StateError>;

    /// Save several keys. Backends that can write them atomically should.
    async fn save_many(&self, entries: &[(String, StateValue)]) -> Result<(), StateError> {
        for (key, value) in entries {
            self.save(key, value).await?;
        }
        Ok(())
    }

    /// Read a key; `None` if it was never written.
    async fn retrieve(&self, key: &str) -> Result<Option<StateValue>, StateError>;

    async fn remove(&self, key: &str) -> Result<(), StateError>;
}

/// Full storage key for `key` under `namespace`.
pub(crate) fn namespaced(namespace: &str, key: &str) -> String {
    format!("{}{}", namespace, key)
}
