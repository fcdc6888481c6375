//! Search documents produced by the transformer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::entity::EntityKind;

/// `{id, name}` pair used for nested people and genre arrays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedRef {
    pub id: String,
    pub name: String,
}

/// Document stored in the `movies` index.
///
/// People are split by role into separate arrays, each mirrored by a
/// names-only array used for full-text matching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieDocument {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    /// Always serialized; `null` when the film has no rating.
    pub rating: Option<f64>,
    #[serde(rename = "type")]
    pub kind: String,
    pub genres: Vec<NamedRef>,
    pub directors: Vec<NamedRef>,
    pub actors: Vec<NamedRef>,
    pub writers: Vec<NamedRef>,
    pub directors_names: Vec<String>,
    pub actors_names: Vec<String>,
    pub writers_names: Vec<String>,
}

/// Document stored in the `genres` index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenreDocument {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub created: DateTime<Utc>,
    pub modified: Option<DateTime<Utc>>,
}

/// Document stored in the `persons` index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonDocument {
    pub id: String,
    pub full_name: String,
    pub created: DateTime<Utc>,
    pub modified: Option<DateTime<Utc>>,
}

/// A document of any kind, ready to be written to its index.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchDocument {
    Movie(MovieDocument),
    Genre(GenreDocument),
    Person(PersonDocument),
}

impl SearchDocument {
    /// Document id; equals the source row id.
    pub fn id(&self) -> &str {
        match self {
            SearchDocument::Movie(doc) => &doc.id,
            SearchDocument::Genre(doc) => &doc.id,
            SearchDocument::Person(doc) => &doc.id,
        }
    }

    pub fn kind(&self) -> EntityKind {
        match self {
            SearchDocument::Movie(_) => EntityKind::Movies,
            SearchDocument::Genre(_) => EntityKind::Genres,
            SearchDocument::Person(_) => EntityKind::Persons,
        }
    }

    /// Serialize the document into the `_source` body sent to the index.
    pub fn to_source(&self) -> Result<Value, serde_json::Error> {
        match self {
            SearchDocument::Movie(doc) => serde_json::to_value(doc),
            SearchDocument::Genre(doc) => serde_json::to_value(doc),
            SearchDocument::Person(doc) => serde_json::to_value(doc),
        }
    }
}
