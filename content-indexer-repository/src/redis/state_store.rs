//! Redis state store.

use async_trait::async_trait;
use content_indexer_shared::StateValue;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use tracing::debug;

use crate::errors::StateError;
use crate::interfaces::{namespaced, ReadinessProbe, StateStore};

/// State store keeping each value as a string under `{namespace}{key}`.
#[derive(Clone)]
pub struct RedisStateStore {
    client: redis::Client,
    namespace: String,
}

impl RedisStateStore {
    /// Create a store for the server at `url`. No connection is opened yet.
    pub fn new(url: &str, namespace: impl Into<String>) -> Result<Self, StateError> {
        let client = redis::Client::open(url).map_err(|e| StateError::connection(e.to_string()))?;
        Ok(Self {
            client,
            namespace: namespace.into(),
        })
    }

    async fn connection(&self) -> Result<MultiplexedConnection, StateError> {
        Ok(self.client.get_multiplexed_async_connection().await?)
    }
}

#[async_trait]
impl StateStore for RedisStateStore {
    async fn save(&self, key: &str, value: &StateValue) -> Result<(), StateError> {
        let mut conn = self.connection().await?;
        let full_key = namespaced(&self.namespace, key);
        let _: () = conn.set(&full_key, value.serialize()).await?;
        debug!(key = %full_key, "Saved state");
        Ok(())
    }

    /// Write every entry in a single `MULTI`/`EXEC` transaction.
    async fn save_many(&self, entries: &[(String, StateValue)]) -> Result<(), StateError> {
        if entries.is_empty() {
            return Ok(());
        }

        let mut pipe = redis::pipe();
        pipe.atomic();
        for (key, value) in entries {
            pipe.set(namespaced(&self.namespace, key), value.serialize())
                .ignore();
        }

        let mut conn = self.connection().await?;
        let _: () = pipe.query_async(&mut conn).await?;
        debug!(keys = entries.len(), "Saved state atomically");
        Ok(())
    }

    async fn retrieve(&self, key: &str) -> Result<Option<StateValue>, StateError> {
        let mut conn = self.connection().await?;
        let raw: Option<String> = conn.get(namespaced(&self.namespace, key)).await?;
        raw.map(|data| StateValue::deserialize(&data).map_err(StateError::from))
            .transpose()
    }

    async fn remove(&self, key: &str) -> Result<(), StateError> {
        let mut conn = self.connection().await?;
        let _: () = conn.del(namespaced(&self.namespace, key)).await?;
        Ok(())
    }
}

#[async_trait]
impl ReadinessProbe for RedisStateStore {
    fn component(&self) -> &'static str {
        "state store"
    }

    async fn is_ready(&self) -> bool {
        let Ok(mut conn) = self.connection().await else {
            return false;
        };
        let pong: Result<String, _> = redis::cmd("PING").query_async(&mut conn).await;
        pong.is_ok()
    }
}
