//! Search engine client trait definition.
//!
//! This module defines the abstract interface for document operations,
//! allowing for different backend implementations (OpenSearch, Elasticsearch, mocks).

use async_trait::async_trait;
use serde_json::Value;

use crate::errors::SearchError;
use crate::types::{BulkIndexSummary, IndexedDocument, UpdateDocumentRequest};

/// Abstract interface for search engine document operations.
///
/// # Thread Safety
///
/// All implementations must be `Send + Sync` to allow use across async tasks.
///
/// # Error Handling
///
/// Transport failures and back-pressure responses surface as
/// `SearchError::ConnectionError` so callers can retry them.
#[async_trait]
pub trait SearchEngineClient: Send + Sync {
    /// Index multiple documents in a single bulk request.
    ///
    /// # Arguments
    ///
    /// * `index` - Target index name
    /// * `documents` - Documents to index; existing documents with the same id are replaced
    ///
    /// # Returns
    ///
    /// * `Ok(BulkIndexSummary)` - Per-item outcome; some items may have failed
    /// * `Err(SearchError)` - If the request as a whole failed
    async fn bulk_index(
        &self,
        index: &str,
        documents: &[IndexedDocument],
    ) -> Result<BulkIndexSummary, SearchError>;

    /// Index (create or replace) a single document.
    async fn index_document(
        &self,
        index: &str,
        document: &IndexedDocument,
    ) -> Result<(), SearchError>;

    /// Overwrite the given fields of an existing document.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - If the document was updated
    /// * `Err(SearchError::NotFound)` - If the document doesn't exist
    /// * `Err(SearchError)` - If the update fails
    async fn update_document(
        &self,
        index: &str,
        request: &UpdateDocumentRequest,
    ) -> Result<(), SearchError>;

    /// Delete a document.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - If the document was deleted (or didn't exist)
    /// * `Err(SearchError)` - If the deletion fails
    async fn delete_document(&self, index: &str, id: &str) -> Result<(), SearchError>;

    /// Fetch a document's `_source`, or `None` if it doesn't exist.
    async fn get_document(&self, index: &str, id: &str) -> Result<Option<Value>, SearchError>;
}
