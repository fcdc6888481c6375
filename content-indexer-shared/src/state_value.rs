//! Values persisted in the state store.

use chrono::{DateTime, Utc};
use serde_json::Value;

/// A persisted state value: either a timestamp or arbitrary JSON.
///
/// Timestamps are stored as RFC 3339 strings and everything else as JSON
/// text. On read an RFC 3339 parse is attempted first, so a value keeps its
/// semantic type across a save/retrieve cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum StateValue {
    Timestamp(DateTime<Utc>),
    Json(Value),
}

impl StateValue {
    /// Encode the value as stored text.
    pub fn serialize(&self) -> String {
        match self {
            StateValue::Timestamp(ts) => ts.to_rfc3339(),
            StateValue::Json(value) => value.to_string(),
        }
    }

    /// Decode stored text.
    pub fn deserialize(data: &str) -> Result<Self, serde_json::Error> {
        if let Ok(ts) = DateTime::parse_from_rfc3339(data) {
            return Ok(StateValue::Timestamp(ts.with_timezone(&Utc)));
        }
        serde_json::from_str(data).map(StateValue::Json)
    }

    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            StateValue::Timestamp(ts) => Some(*ts),
            StateValue::Json(Value::String(s)) => DateTime::parse_from_rfc3339(s)
                .ok()
                .map(|ts| ts.with_timezone(&Utc)),
            StateValue::Json(_) => None,
        }
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            StateValue::Json(value) => Some(value),
            StateValue::Timestamp(_) => None,
        }
    }
}

impl From<DateTime<Utc>> for StateValue {
    fn from(ts: DateTime<Utc>) -> Self {
        StateValue::Timestamp(ts)
    }
}

impl From<Value> for StateValue {
    fn from(value: Value) -> Self {
        StateValue::Json(value)
    }
}
