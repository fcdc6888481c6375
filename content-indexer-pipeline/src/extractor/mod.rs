//! Extractor module for the content indexer pipeline.
//!
//! Reads rows from the content source in cursor order.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use content_indexer_repository::{BatchRequest, ContentSource};
use content_indexer_shared::{CursorState, EntityKind, Relation, SourceRow};
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::errors::PipelineError;
use crate::retry::RetryPolicy;

/// Configuration for the extractor.
#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    /// Rows per batch.
    pub batch_size: usize,
    /// Retry policy for every source call.
    pub retry: RetryPolicy,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            batch_size: 1000,
            retry: RetryPolicy::default(),
        }
    }
}

/// Extractor that reads denormalized rows from the content source.
pub struct Extractor {
    source: Arc<dyn ContentSource>,
    config: ExtractorConfig,
}

impl Extractor {
    /// Create a new extractor with the given source.
    pub fn new(source: Arc<dyn ContentSource>) -> Self {
        Self {
            source,
            config: ExtractorConfig::default(),
        }
    }

    /// Create a new extractor with custom configuration.
    pub fn with_config(source: Arc<dyn ContentSource>, config: ExtractorConfig) -> Self {
        Self { source, config }
    }

    /// Open a reader over rows of `kind` changed since a boundary.
    ///
    /// # Arguments
    ///
    /// * `kind` - Entity kind to read
    /// * `since` - Boundary timestamp; rows at or after it are read
    /// * `exclude_ids` - Rows at exactly `since` that were already emitted
    /// * `batch_size` - Rows per batch; clamped to at least 1
    pub fn fetch(
        &self,
        kind: EntityKind,
        since: DateTime<Utc>,
        exclude_ids: Vec<Uuid>,
        batch_size: usize,
    ) -> BatchReader {
        BatchReader {
            source: Arc::clone(&self.source),
            retry: self.config.retry.clone(),
            kind,
            position: CursorState::new(since, exclude_ids.into_iter().collect()),
            batch_size: batch_size.max(1),
            exhausted: false,
        }
    }

    /// Open a reader resuming from a saved cursor with the configured batch size.
    pub fn fetch_from(&self, kind: EntityKind, cursor: &CursorState) -> BatchReader {
        self.fetch(
            kind,
            cursor.last_seen_timestamp,
            cursor.exclude_ids(),
            self.config.batch_size,
        )
    }

    /// Fetch a single row, or `None` if it no longer exists.
    #[instrument(skip(self), fields(kind = %kind, id = %id))]
    pub async fn fetch_one(
        &self,
        kind: EntityKind,
        id: Uuid,
    ) -> Result<Option<SourceRow>, PipelineError> {
        self.config
            .retry
            .run("fetch_one", || {
                let source = Arc::clone(&self.source);
                async move { source.fetch_one(kind, id).await.map_err(PipelineError::from) }
            })
            .await
    }

    /// Film works linked to the row `id` of `relation`.
    #[instrument(skip(self), fields(id = %id))]
    pub async fn linked_film_ids(
        &self,
        relation: Relation,
        id: Uuid,
    ) -> Result<Vec<Uuid>, PipelineError> {
        let ids = self
            .config
            .retry
            .run("linked_film_ids", || {
                let source = Arc::clone(&self.source);
                async move {
                    source
                        .linked_film_ids(relation, id)
                        .await
                        .map_err(PipelineError::from)
                }
            })
            .await?;

        debug!(table = relation.table(), count = ids.len(), "Resolved linked film works");
        Ok(ids)
    }
}

/// Lazy sequence of row batches for one entity kind.
///
/// Each batch holds `batch_size` rows except the last non-empty one, which
/// may be shorter. Pages are keyset based: after every batch the reader's
/// own position advances past the returned rows, so a row modified while
/// reading moves to the end of the sequence instead of shifting the rows
/// behind it. Once exhausted the reader keeps returning empty batches.
pub struct BatchReader {
    source: Arc<dyn ContentSource>,
    retry: RetryPolicy,
    kind: EntityKind,
    position: CursorState,
    batch_size: usize,
    exhausted: bool,
}

impl BatchReader {
    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Fetch the next batch; empty once the rows are exhausted.
    pub async fn next_batch(&mut self) -> Result<Vec<SourceRow>, PipelineError> {
        if self.exhausted {
            return Ok(Vec::new());
        }

        let request = BatchRequest {
            since: self.position.last_seen_timestamp,
            exclude_ids: self.position.exclude_ids(),
            limit: self.batch_size,
        };
        let kind = self.kind;

        let rows = self
            .retry
            .run("fetch_batch", || {
                let source = Arc::clone(&self.source);
                let request = request.clone();
                async move {
                    source
                        .fetch_batch(kind, &request)
                        .await
                        .map_err(PipelineError::from)
                }
            })
            .await?;

        if rows.len() < self.batch_size {
            self.exhausted = true;
        }
        self.position.advance(&rows);

        debug!(kind = %kind, count = rows.len(), exhausted = self.exhausted, "Read batch");
        Ok(rows)
    }
}
