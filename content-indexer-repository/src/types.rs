//! Request and response types for repository operations.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use uuid::Uuid;

/// A document body ready to be written under a given id.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedDocument {
    /// Document id; equals the source row id.
    pub id: String,
    /// Full `_source` body.
    pub source: Value,
}

impl IndexedDocument {
    pub fn new(id: impl Into<String>, source: Value) -> Self {
        Self {
            id: id.into(),
            source,
        }
    }
}

/// Request to overwrite selected top-level fields of an existing document.
///
/// Fields not present in the request are left unchanged in the index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateDocumentRequest {
    pub id: String,
    pub fields: Map<String, Value>,
}

impl UpdateDocumentRequest {
    /// Check if any fields are set for update.
    pub fn has_updates(&self) -> bool {
        !self.fields.is_empty()
    }
}

/// Result of a bulk operation for a single document.
#[derive(Debug, Clone, PartialEq)]
pub struct BulkItemResult {
    pub id: String,
    pub success: bool,
    /// Engine-reported reason when the item failed.
    pub error: Option<String>,
}

/// Summary of a bulk index request: aggregate counts and per-item results.
///
/// A bulk request can be accepted while individual items are rejected, so
/// callers inspect `failed` rather than relying on the request result alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BulkIndexSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub results: Vec<BulkItemResult>,
}

impl BulkIndexSummary {
    /// Build a summary from per-item results.
    pub fn from_results(results: Vec<BulkItemResult>) -> Self {
        let succeeded = results.iter().filter(|r| r.success).count();
        Self {
            total: results.len(),
            succeeded,
            failed: results.len() - succeeded,
            results,
        }
    }

    /// Ids of the items the engine rejected.
    pub fn failed_ids(&self) -> Vec<String> {
        self.results
            .iter()
            .filter(|r| !r.success)
            .map(|r| r.id.clone())
            .collect()
    }
}

/// Outcome of applying an index schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaOutcome {
    Created,
    AlreadyExists,
}

/// Page request against a source table, ordered by `(timestamp, id)`.
///
/// Rows strictly newer than `since` are always returned. Rows exactly at
/// `since` are returned unless their id is in `exclude_ids`.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchRequest {
    pub since: DateTime<Utc>,
    pub exclude_ids: Vec<Uuid>,
    pub limit: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_update_request_has_updates() {
        let mut request = UpdateDocumentRequest {
            id: "f1".to_string(),
            ..Default::default()
        };
        assert!(!request.has_updates());

        request
            .fields
            .insert("genres".to_string(), json!([{"id": "g1", "name": "Drama"}]));
        assert!(request.has_updates());
    }

    #[test]
    fn test_bulk_summary_counts() {
        let summary = BulkIndexSummary::from_results(vec![
            BulkItemResult {
                id: "a".to_string(),
                success: true,
                error: None,
            },
            BulkItemResult {
                id: "b".to_string(),
                success: false,
                error: Some("mapper_parsing_exception".to_string()),
            },
        ]);

        assert_eq!(summary.total, 2);
        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.failed_ids(), vec!["b".to_string()]);
    }
}
