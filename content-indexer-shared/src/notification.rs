//! Change notifications delivered by database triggers.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::entity::TableKind;

/// Row operation that fired the trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeOperation {
    Insert,
    Update,
    Delete,
}

impl fmt::Display for ChangeOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeOperation::Insert => f.write_str("INSERT"),
            ChangeOperation::Update => f.write_str("UPDATE"),
            ChangeOperation::Delete => f.write_str("DELETE"),
        }
    }
}

/// Payload of one change notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeNotification {
    /// Table of the changed row.
    pub table: String,
    pub operation: ChangeOperation,
    /// Id of the changed row in `table`.
    pub id: Uuid,
    /// Film work referenced by a link row; sent by link-table triggers so
    /// that deleted link rows can still be resolved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub film_work_id: Option<Uuid>,
    /// Previous film work of a link row whose `film_work_id` was updated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_film_work_id: Option<Uuid>,
}

/// A notification payload that could not be decoded.
#[derive(Debug, Clone, Error)]
#[error("Malformed notification payload {payload:?}: {reason}")]
pub struct MalformedNotification {
    pub payload: String,
    pub reason: String,
}

impl ChangeNotification {
    pub fn new(table: impl Into<String>, operation: ChangeOperation, id: Uuid) -> Self {
        Self {
            table: table.into(),
            operation,
            id,
            film_work_id: None,
            old_film_work_id: None,
        }
    }

    /// Parse a raw JSON payload.
    pub fn parse(payload: &str) -> Result<Self, MalformedNotification> {
        serde_json::from_str(payload).map_err(|e| MalformedNotification {
            payload: payload.to_string(),
            reason: e.to_string(),
        })
    }

    /// Classify the notification's table; `None` for untracked tables.
    pub fn table_kind(&self) -> Option<TableKind> {
        TableKind::from_table(&self.table)
    }
}
