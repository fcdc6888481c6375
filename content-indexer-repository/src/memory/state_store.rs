use std::collections::HashMap;

use async_trait::async_trait;
use content_indexer_shared::StateValue;
use tokio::sync::Mutex;

use crate::errors::StateError;
use crate::interfaces::{namespaced, ReadinessProbe, StateStore};

/// State store held in process memory.
///
/// Values go through the same text encoding as the Redis store, so a value
/// read back has the same semantic type. Lost on restart.
#[derive(Default)]
pub struct InMemoryStateStore {
    namespace: String,
    entries: Mutex<HashMap<String, String>>,
}

impl InMemoryStateStore {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Raw stored text of a key, without the namespace.
    pub async fn raw(&self, key: &str) -> Option<String> {
        self.entries
            .lock()
            .await
            .get(&namespaced(&self.namespace, key))
            .cloned()
    }
}

#[async_trait]
impl StateStore for InMemoryStateStore {
    async fn save(&self, key: &str, value: &StateValue) -> Result<(), StateError> {
        self.entries
            .lock()
            .await
            .insert(namespaced(&self.namespace, key), value.serialize());
        Ok(())
    }

    async fn save_many(&self, entries: &[(String, StateValue)]) -> Result<(), StateError> {
        let mut guard = self.entries.lock().await;
        for (key, value) in entries {
            guard.insert(namespaced(&self.namespace, key), value.serialize());
        }
        Ok(())
    }

    async fn retrieve(&self, key: &str) -> Result<Option<StateValue>, StateError> {
        let raw = self.raw(key).await;
        raw.map(|data| StateValue::deserialize(&data).map_err(StateError::from))
            .transpose()
    }

    async fn remove(&self, key: &str) -> Result<(), StateError> {
        self.entries
            .lock()
            .await
            .remove(&namespaced(&self.namespace, key));
        Ok(())
    }
}

#[async_trait]
impl ReadinessProbe for InMemoryStateStore {
    fn component(&self) -> &'static str {
        "state store"
    }

    async fn is_ready(&self) -> bool {
        true
    }
}
