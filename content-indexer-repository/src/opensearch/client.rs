//! OpenSearch client implementation.
//!
//! This module provides the concrete implementation of `SearchEngineClient`,
//! `SchemaApplier` and `ReadinessProbe` using the OpenSearch Rust client.

use async_trait::async_trait;
use opensearch::{
    cluster::ClusterHealthParts,
    http::request::JsonBody,
    http::response::Response,
    http::transport::{SingleNodeConnectionPool, TransportBuilder},
    indices::IndicesCreateParts,
    params::WaitForStatus,
    BulkParts, DeleteParts, GetParts, IndexParts, OpenSearch, UpdateParts,
};
use serde_json::{json, Value};
use tracing::{debug, error, info, instrument, warn};
use url::Url;

use crate::errors::SearchError;
use crate::interfaces::{ReadinessProbe, SchemaApplier, SearchEngineClient};
use crate::types::{
    BulkIndexSummary, BulkItemResult, IndexedDocument, SchemaOutcome, UpdateDocumentRequest,
};

/// Error type OpenSearch returns when creating an index that exists.
const ALREADY_EXISTS_ERROR: &str = "resource_already_exists_exception";

/// OpenSearch client implementation.
///
/// # Example
///
/// ```ignore
/// let client = OpenSearchClient::new("http://localhost:9200")?;
/// let doc = IndexedDocument::new("f1", json!({"id": "f1", "title": "Solaris"}));
/// client.index_document("movies", &doc).await?;
/// ```
pub struct OpenSearchClient {
    client: OpenSearch,
}

impl OpenSearchClient {
    /// Create a new OpenSearch client for the specified URL.
    ///
    /// No request is sent; use [`ReadinessProbe::wait_until_ready`] to wait
    /// for the cluster.
    ///
    /// # Arguments
    ///
    /// * `url` - The server URL (e.g., "http://localhost:9200")
    ///
    /// # Returns
    ///
    /// * `Ok(OpenSearchClient)` - A new client instance
    /// * `Err(SearchError)` - If the URL is invalid or transport setup fails
    pub fn new(url: &str) -> Result<Self, SearchError> {
        let parsed_url = Url::parse(url).map_err(|e| SearchError::connection(e.to_string()))?;

        let conn_pool = SingleNodeConnectionPool::new(parsed_url);
        let transport = TransportBuilder::new(conn_pool)
            .disable_proxy()
            .build()
            .map_err(|e| SearchError::connection(e.to_string()))?;

        let client = OpenSearch::new(transport);

        info!(url = %url, "Created OpenSearch client");

        Ok(Self { client })
    }

    /// Map a non-success response to an error.
    ///
    /// Back-pressure and gateway statuses become connection errors so that
    /// callers retry them; everything else goes through `make`.
    async fn error_from_response(
        response: Response,
        make: fn(String) -> SearchError,
    ) -> SearchError {
        let status = response.status_code().as_u16();
        let body = response.text().await.unwrap_or_default();
        Self::classify_status(status, body, make)
    }

    fn classify_status(status: u16, body: String, make: fn(String) -> SearchError) -> SearchError {
        let message = format!("Request failed with status {}: {}", status, body);
        match status {
            429 | 502 | 503 | 504 => SearchError::ConnectionError(message),
            _ => make(message),
        }
    }

    /// Turn a bulk response body into per-item results.
    ///
    /// Items are matched to documents by position; the `_id` reported by
    /// the engine is preferred when present.
    fn parse_bulk_response(documents: &[IndexedDocument], body: &Value) -> BulkIndexSummary {
        let Some(items) = body["items"].as_array() else {
            let errors = body["errors"].as_bool().unwrap_or(false);
            return BulkIndexSummary::from_results(
                documents
                    .iter()
                    .map(|doc| BulkItemResult {
                        id: doc.id.clone(),
                        success: !errors,
                        error: errors.then(|| "bulk response carried no items".to_string()),
                    })
                    .collect(),
            );
        };

        let results = documents
            .iter()
            .enumerate()
            .map(|(position, doc)| {
                let item = items.get(position).map(|item| &item["index"]);
                let id = item
                    .and_then(|item| item["_id"].as_str())
                    .unwrap_or(&doc.id)
                    .to_string();
                let status = item.and_then(|item| item["status"].as_u64()).unwrap_or(0);
                let success = (200..300).contains(&status);
                let error = if success {
                    None
                } else {
                    Some(
                        item.map(|item| item["error"].to_string())
                            .unwrap_or_else(|| "missing bulk item".to_string()),
                    )
                };
                BulkItemResult { id, success, error }
            })
            .collect();

        BulkIndexSummary::from_results(results)
    }
}

#[async_trait]
impl SearchEngineClient for OpenSearchClient {
    #[instrument(skip(self, documents), fields(index = %index, count = documents.len()))]
    async fn bulk_index(
        &self,
        index: &str,
        documents: &[IndexedDocument],
    ) -> Result<BulkIndexSummary, SearchError> {
        if documents.is_empty() {
            return Ok(BulkIndexSummary::default());
        }

        let mut body: Vec<JsonBody<Value>> = Vec::with_capacity(documents.len() * 2);
        for doc in documents {
            body.push(json!({ "index": { "_id": doc.id } }).into());
            body.push(doc.source.clone().into());
        }

        let response = self
            .client
            .bulk(BulkParts::Index(index))
            .body(body)
            .send()
            .await
            .map_err(|e| SearchError::connection(e.to_string()))?;

        if !response.status_code().is_success() {
            let err = Self::error_from_response(response, SearchError::BulkIndexError).await;
            error!(error = %err, "Bulk request failed");
            return Err(err);
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| SearchError::ParseError(e.to_string()))?;
        let summary = Self::parse_bulk_response(documents, &body);

        if summary.failed > 0 {
            warn!(
                succeeded = summary.succeeded,
                failed = summary.failed,
                "Bulk request completed with item failures"
            );
        } else {
            debug!(succeeded = summary.succeeded, "Bulk request completed");
        }

        Ok(summary)
    }

    async fn index_document(
        &self,
        index: &str,
        document: &IndexedDocument,
    ) -> Result<(), SearchError> {
        let response = self
            .client
            .index(IndexParts::IndexId(index, &document.id))
            .body(&document.source)
            .send()
            .await
            .map_err(|e| SearchError::connection(e.to_string()))?;

        if !response.status_code().is_success() {
            let err = Self::error_from_response(response, SearchError::IndexError).await;
            error!(index = %index, doc_id = %document.id, error = %err, "Index request failed");
            return Err(err);
        }

        debug!(index = %index, doc_id = %document.id, "Document indexed");
        Ok(())
    }

    async fn update_document(
        &self,
        index: &str,
        request: &UpdateDocumentRequest,
    ) -> Result<(), SearchError> {
        if !request.has_updates() {
            return Ok(());
        }

        let response = self
            .client
            .update(UpdateParts::IndexId(index, &request.id))
            .body(json!({ "doc": request.fields }))
            .send()
            .await
            .map_err(|e| SearchError::connection(e.to_string()))?;

        let status = response.status_code();
        if status.as_u16() == 404 {
            return Err(SearchError::not_found(index, &request.id));
        }
        if !status.is_success() {
            let err = Self::error_from_response(response, SearchError::UpdateError).await;
            error!(index = %index, doc_id = %request.id, error = %err, "Update request failed");
            return Err(err);
        }

        debug!(index = %index, doc_id = %request.id, "Document updated");
        Ok(())
    }

    async fn delete_document(&self, index: &str, id: &str) -> Result<(), SearchError> {
        let response = self
            .client
            .delete(DeleteParts::IndexId(index, id))
            .send()
            .await
            .map_err(|e| SearchError::connection(e.to_string()))?;

        let status = response.status_code();

        // 404 is acceptable - document may not exist
        if !status.is_success() && status.as_u16() != 404 {
            let err = Self::error_from_response(response, SearchError::DeleteError).await;
            error!(index = %index, doc_id = %id, error = %err, "Delete request failed");
            return Err(err);
        }

        debug!(index = %index, doc_id = %id, "Document deleted");
        Ok(())
    }

    async fn get_document(&self, index: &str, id: &str) -> Result<Option<Value>, SearchError> {
        let response = self
            .client
            .get(GetParts::IndexId(index, id))
            .send()
            .await
            .map_err(|e| SearchError::connection(e.to_string()))?;

        let status = response.status_code();
        if status.as_u16() == 404 {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(Self::error_from_response(response, SearchError::ParseError).await);
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| SearchError::ParseError(e.to_string()))?;

        if body["found"].as_bool() == Some(false) {
            return Ok(None);
        }
        Ok(body.get("_source").cloned())
    }
}

#[async_trait]
impl SchemaApplier for OpenSearchClient {
    #[instrument(skip(self, schema), fields(index = %index))]
    async fn apply_schema(
        &self,
        index: &str,
        schema: &Value,
    ) -> Result<SchemaOutcome, SearchError> {
        let response = self
            .client
            .indices()
            .create(IndicesCreateParts::Index(index))
            .body(schema)
            .send()
            .await
            .map_err(|e| SearchError::connection(e.to_string()))?;

        let status = response.status_code().as_u16();
        if (200..300).contains(&status) {
            info!("Index created");
            return Ok(SchemaOutcome::Created);
        }

        let body = response.text().await.unwrap_or_default();
        if status == 400 && body.contains(ALREADY_EXISTS_ERROR) {
            info!("Index already exists");
            return Ok(SchemaOutcome::AlreadyExists);
        }

        Err(Self::classify_status(status, body, SearchError::IndexCreationError))
    }
}

#[async_trait]
impl ReadinessProbe for OpenSearchClient {
    fn component(&self) -> &'static str {
        "search engine"
    }

    /// The cluster is ready once its health is at least yellow.
    async fn is_ready(&self) -> bool {
        let response = match self
            .client
            .cluster()
            .health(ClusterHealthParts::None)
            .wait_for_status(WaitForStatus::Yellow)
            .timeout("1s")
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                debug!(error = %e, "Cluster health request failed");
                return false;
            }
        };

        if !response.status_code().is_success() {
            return false;
        }

        match response.json::<Value>().await {
            Ok(body) => matches!(body["status"].as_str(), Some("yellow") | Some("green")),
            Err(_) => false,
        }
    }
}
