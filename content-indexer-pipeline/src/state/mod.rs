//! Cursor persistence for the content indexer pipeline.

use std::collections::BTreeSet;
use std::sync::Arc;

use content_indexer_repository::{StateError, StateStore};
use content_indexer_shared::{CursorState, EntityKind, StateValue};
use serde_json::Value;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::errors::PipelineError;
use crate::retry::RetryPolicy;

/// Reads and writes per-kind cursors in the state store.
///
/// A cursor is stored as two keys: `{kind}_time` holds the last seen
/// timestamp and `{kind}_ids` the JSON array of ids emitted at it. Both keys
/// are written in one `save_many` call.
pub struct CursorStore {
    store: Arc<dyn StateStore>,
    retry: RetryPolicy,
}

impl CursorStore {
    pub fn new(store: Arc<dyn StateStore>) -> Self {
        Self {
            store,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(store: Arc<dyn StateStore>, retry: RetryPolicy) -> Self {
        Self { store, retry }
    }

    /// Load the cursor of `kind`; a kind never saved starts at the epoch.
    #[instrument(skip(self), fields(kind = %kind))]
    pub async fn load(&self, kind: EntityKind) -> Result<CursorState, PipelineError> {
        let time_key = kind.time_key();
        let ids_key = kind.ids_key();

        let Some(time) = self.retrieve(&time_key).await? else {
            debug!("No saved cursor, starting from the beginning");
            return Ok(CursorState::default());
        };
        let last_seen_timestamp = time.as_timestamp().ok_or_else(|| {
            PipelineError::State(StateError::serialization(format!(
                "{} is not a timestamp",
                time_key
            )))
        })?;

        let last_batch_ids = match self.retrieve(&ids_key).await? {
            Some(value) => parse_ids(&ids_key, &value)?,
            None => BTreeSet::new(),
        };

        debug!(
            since = %last_seen_timestamp,
            boundary_ids = last_batch_ids.len(),
            "Loaded cursor"
        );
        Ok(CursorState::new(last_seen_timestamp, last_batch_ids))
    }

    /// Persist the cursor of `kind`.
    pub async fn save(&self, kind: EntityKind, cursor: &CursorState) -> Result<(), PipelineError> {
        let ids: Vec<Value> = cursor
            .last_batch_ids
            .iter()
            .map(|id| Value::String(id.to_string()))
            .collect();
        let entries = vec![
            (kind.time_key(), StateValue::Timestamp(cursor.last_seen_timestamp)),
            (kind.ids_key(), StateValue::Json(Value::Array(ids))),
        ];

        self.retry
            .run("save_cursor", || {
                let store = Arc::clone(&self.store);
                let entries = &entries;
                async move { store.save_many(entries).await.map_err(PipelineError::from) }
            })
            .await
    }

    /// Forget the cursor of `kind`, forcing a full reload on next catch-up.
    pub async fn reset(&self, kind: EntityKind) -> Result<(), PipelineError> {
        for key in [kind.time_key(), kind.ids_key()] {
            self.retry
                .run("remove_cursor", || {
                    let store = Arc::clone(&self.store);
                    let key = key.as_str();
                    async move { store.remove(key).await.map_err(PipelineError::from) }
                })
                .await?;
        }
        Ok(())
    }

    async fn retrieve(&self, key: &str) -> Result<Option<StateValue>, PipelineError> {
        self.retry
            .run("retrieve_state", || {
                let store = Arc::clone(&self.store);
                async move { store.retrieve(key).await.map_err(PipelineError::from) }
            })
            .await
    }
}

fn parse_ids(key: &str, value: &StateValue) -> Result<BTreeSet<Uuid>, PipelineError> {
    let invalid = || {
        PipelineError::State(StateError::serialization(format!(
            "{} is not an array of ids",
            key
        )))
    };

    let Some(Value::Array(items)) = value.as_json() else {
        return Err(invalid());
    };
    items
        .iter()
        .map(|item| {
            item.as_str()
                .and_then(|s| Uuid::parse_str(s).ok())
                .ok_or_else(invalid)
        })
        .collect()
}
