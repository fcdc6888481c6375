//! Denormalized rows read from the relational store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entity::EntityKind;

/// A person credited on a film work, with the role from the link table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonCredit {
    pub id: Uuid,
    pub name: String,
    pub role: String,
}

/// A genre attached to a film work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenreRef {
    pub id: Uuid,
    pub name: String,
}

/// A film work joined with its genres and credited persons.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilmWorkRow {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub rating: Option<f64>,
    #[serde(rename = "type")]
    pub kind: String,
    pub created: DateTime<Utc>,
    pub modified: Option<DateTime<Utc>>,
    #[serde(default)]
    pub genres: Option<Vec<GenreRef>>,
    #[serde(default)]
    pub persons: Option<Vec<PersonCredit>>,
}

/// A genre row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenreRow {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created: DateTime<Utc>,
    pub modified: Option<DateTime<Utc>>,
}

/// A person row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonRow {
    pub id: Uuid,
    pub full_name: String,
    pub created: DateTime<Utc>,
    pub modified: Option<DateTime<Utc>>,
}

/// One extraction unit of any entity kind.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceRow {
    Movie(FilmWorkRow),
    Genre(GenreRow),
    Person(PersonRow),
}

impl SourceRow {
    /// The row's stable unique id.
    pub fn id(&self) -> Uuid {
        match self {
            SourceRow::Movie(row) => row.id,
            SourceRow::Genre(row) => row.id,
            SourceRow::Person(row) => row.id,
        }
    }

    /// Entity kind the row belongs to.
    pub fn kind(&self) -> EntityKind {
        match self {
            SourceRow::Movie(_) => EntityKind::Movies,
            SourceRow::Genre(_) => EntityKind::Genres,
            SourceRow::Person(_) => EntityKind::Persons,
        }
    }

    /// Timestamp used for cursoring: `modified`, falling back to `created`.
    pub fn updated_or_created(&self) -> DateTime<Utc> {
        let (created, modified) = match self {
            SourceRow::Movie(row) => (row.created, row.modified),
            SourceRow::Genre(row) => (row.created, row.modified),
            SourceRow::Person(row) => (row.created, row.modified),
        };
        modified.unwrap_or(created)
    }
}
