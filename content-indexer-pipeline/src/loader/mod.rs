//! Loader module for the content indexer pipeline.
//!
//! Writes documents into the search indices.

use std::sync::Arc;

use content_indexer_repository::{
    IndexSchemas, IndexedDocument, SchemaApplier, SchemaOutcome, SearchEngineClient,
    UpdateDocumentRequest,
};
use content_indexer_shared::{EntityKind, SearchDocument};
use serde_json::{Map, Value};
use tracing::{debug, error, info, instrument, warn};

use crate::errors::PipelineError;
use crate::retry::RetryPolicy;
use crate::transformer::relation_fields;

/// Configuration for the search loader.
#[derive(Debug, Clone)]
pub struct LoaderConfig {
    /// Retry policy for transient search engine failures.
    pub retry: RetryPolicy,
    /// Schema applied to each index by [`SearchLoader::ensure_indices`].
    pub schemas: IndexSchemas,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            schemas: IndexSchemas::builtin(),
        }
    }
}

/// Outcome of a bulk load.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadReport {
    /// Documents the engine accepted.
    pub loaded: usize,
    /// Ids of documents the engine rejected.
    pub failed_ids: Vec<String>,
}

/// How a refresh reached the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Relation fields were updated in place.
    Updated,
    /// The full document was indexed.
    Indexed,
}

/// Loader that writes documents into the search engine.
///
/// Every write is idempotent: indexing replaces the whole document and
/// deleting a missing document succeeds, so replaying a batch after a crash
/// leaves the index in the same state.
pub struct SearchLoader {
    client: Arc<dyn SearchEngineClient>,
    schema_applier: Arc<dyn SchemaApplier>,
    config: LoaderConfig,
}

impl SearchLoader {
    /// Create a new search loader with the given client.
    pub fn new(
        client: Arc<dyn SearchEngineClient>,
        schema_applier: Arc<dyn SchemaApplier>,
    ) -> Self {
        Self {
            client,
            schema_applier,
            config: LoaderConfig::default(),
        }
    }

    /// Create a new search loader with custom configuration.
    pub fn with_config(
        client: Arc<dyn SearchEngineClient>,
        schema_applier: Arc<dyn SchemaApplier>,
        config: LoaderConfig,
    ) -> Self {
        Self {
            client,
            schema_applier,
            config,
        }
    }

    fn indexed(document: &SearchDocument) -> Result<IndexedDocument, PipelineError> {
        let source = document
            .to_source()
            .map_err(|e| PipelineError::Search(e.into()))?;
        Ok(IndexedDocument::new(document.id(), source))
    }

    /// Index all documents in one bulk request.
    ///
    /// Per-document rejections do not fail the call; they are logged and
    /// returned in [`LoadReport::failed_ids`]. Transient failures of the whole
    /// request are retried.
    #[instrument(skip(self, documents), fields(index = %index, count = documents.len()))]
    pub async fn load_bulk(
        &self,
        index: &str,
        documents: &[SearchDocument],
    ) -> Result<LoadReport, PipelineError> {
        if documents.is_empty() {
            return Ok(LoadReport::default());
        }

        let bodies = documents
            .iter()
            .map(Self::indexed)
            .collect::<Result<Vec<_>, _>>()?;

        let summary = self
            .config
            .retry
            .run("bulk_index", || {
                let client = Arc::clone(&self.client);
                let bodies = &bodies;
                async move { client.bulk_index(index, bodies).await.map_err(PipelineError::from) }
            })
            .await?;

        for result in summary.results.iter().filter(|r| !r.success) {
            error!(
                doc_id = %result.id,
                error = result.error.as_deref().unwrap_or("unknown"),
                "Document rejected by search engine"
            );
        }

        let report = LoadReport {
            loaded: summary.succeeded,
            failed_ids: summary.failed_ids(),
        };
        debug!(loaded = report.loaded, failed = report.failed_ids.len(), "Bulk load complete");
        Ok(report)
    }

    /// Index (create or replace) a single document.
    pub async fn index(&self, document: &SearchDocument) -> Result<(), PipelineError> {
        let body = Self::indexed(document)?;
        let index = document.kind().index_name();

        self.config
            .retry
            .run("index_document", || {
                let client = Arc::clone(&self.client);
                let body = &body;
                async move {
                    client
                        .index_document(index, body)
                        .await
                        .map_err(PipelineError::from)
                }
            })
            .await
    }

    /// Overwrite `fields` of an existing document.
    ///
    /// # Returns
    ///
    /// * `Err(PipelineError::NotFound)` - If the document doesn't exist
    pub async fn update(
        &self,
        index: &str,
        id: &str,
        fields: Map<String, Value>,
    ) -> Result<(), PipelineError> {
        let request = UpdateDocumentRequest { id: id.to_string(), fields };

        self.config
            .retry
            .run("update_document", || {
                let client = Arc::clone(&self.client);
                let request = &request;
                async move {
                    client
                        .update_document(index, request)
                        .await
                        .map_err(PipelineError::from)
                }
            })
            .await
    }

    /// Bring an indexed document up to date after a related row changed.
    ///
    /// Movie documents get their relation fields updated in place; when the
    /// document is not indexed yet the full document is indexed instead.
    /// Genre and person documents have no relation fields and are indexed.
    pub async fn refresh(&self, document: &SearchDocument) -> Result<RefreshOutcome, PipelineError> {
        let SearchDocument::Movie(movie) = document else {
            self.index(document).await?;
            return Ok(RefreshOutcome::Indexed);
        };

        match self
            .update(EntityKind::Movies.index_name(), &movie.id, relation_fields(movie))
            .await
        {
            Ok(()) => Ok(RefreshOutcome::Updated),
            Err(e) if e.is_not_found() => {
                debug!(doc_id = %movie.id, "Document missing, indexing in full");
                self.index(document).await?;
                Ok(RefreshOutcome::Indexed)
            }
            Err(e) => Err(e),
        }
    }

    /// Delete a document; a missing document is not an error.
    pub async fn delete(&self, index: &str, id: &str) -> Result<(), PipelineError> {
        self.config
            .retry
            .run("delete_document", || {
                let client = Arc::clone(&self.client);
                async move { client.delete_document(index, id).await.map_err(PipelineError::from) }
            })
            .await
    }

    /// Fetch the stored document source, or `None`.
    pub async fn get(&self, index: &str, id: &str) -> Result<Option<Value>, PipelineError> {
        self.client
            .get_document(index, id)
            .await
            .map_err(PipelineError::from)
    }

    /// Create every index that does not exist yet.
    ///
    /// An index that already exists counts as success. Any other failure is
    /// returned as [`PipelineError::FatalConfig`] unless it is transient and
    /// the retries ran out.
    #[instrument(skip(self))]
    pub async fn ensure_indices(&self) -> Result<(), PipelineError> {
        for kind in EntityKind::ALL {
            let index = kind.index_name();
            let schema = self.config.schemas.get(kind);

            let outcome = self
                .config
                .retry
                .run("apply_schema", || {
                    let applier = Arc::clone(&self.schema_applier);
                    let schema = &schema;
                    async move {
                        applier
                            .apply_schema(index, schema)
                            .await
                            .map_err(PipelineError::from)
                    }
                })
                .await
                .map_err(|e| {
                    if e.is_transient() {
                        e
                    } else {
                        PipelineError::fatal_config(format!(
                            "Failed to create index {}: {}",
                            index, e
                        ))
                    }
                })?;

            match outcome {
                SchemaOutcome::Created => info!(index, "Created index"),
                SchemaOutcome::AlreadyExists => debug!(index, "Index already exists"),
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for SearchLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchLoader")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Log a partial bulk failure for one kind.
pub(crate) fn warn_partial_failure(kind: EntityKind, report: &LoadReport) {
    if !report.failed_ids.is_empty() {
        warn!(
            kind = %kind,
            failed = report.failed_ids.len(),
            loaded = report.loaded,
            "Batch loaded with rejected documents"
        );
    }
}
