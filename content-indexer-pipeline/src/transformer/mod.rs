//! Transformer module for the content indexer pipeline.
//!
//! Maps source rows into search documents. Pure: no I/O and no clock.

use content_indexer_shared::{
    FilmWorkRow, GenreDocument, GenreRow, MovieDocument, NamedRef, PersonDocument, PersonRow,
    SearchDocument, SourceRow,
};
use serde_json::{json, Map, Value};
use tracing::{debug, instrument};

/// Document arrays people are grouped into by their credit role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleGroup {
    Directors,
    Actors,
    Writers,
}

impl RoleGroup {
    /// Map a credit role to its group, ignoring case and surrounding space.
    ///
    /// Roles outside the map return `None` and the credit is dropped.
    pub fn from_role(role: &str) -> Option<Self> {
        match role.trim().to_ascii_lowercase().as_str() {
            "director" => Some(RoleGroup::Directors),
            "actor" => Some(RoleGroup::Actors),
            "writer" => Some(RoleGroup::Writers),
            _ => None,
        }
    }
}

/// Transformer that converts source rows into search documents.
#[derive(Debug, Clone, Copy, Default)]
pub struct Transformer;

impl Transformer {
    pub fn new() -> Self {
        Self
    }

    /// Transform one row into the document of its kind.
    pub fn transform(&self, row: &SourceRow) -> SearchDocument {
        match row {
            SourceRow::Movie(film) => SearchDocument::Movie(Self::movie(film)),
            SourceRow::Genre(genre) => SearchDocument::Genre(Self::genre(genre)),
            SourceRow::Person(person) => SearchDocument::Person(Self::person(person)),
        }
    }

    /// Transform a batch, preserving order.
    #[instrument(skip(self, rows), fields(row_count = rows.len()))]
    pub fn transform_batch(&self, rows: &[SourceRow]) -> Vec<SearchDocument> {
        let documents: Vec<SearchDocument> = rows.iter().map(|row| self.transform(row)).collect();
        debug!(document_count = documents.len(), "Transformed batch");
        documents
    }

    fn movie(film: &FilmWorkRow) -> MovieDocument {
        let mut directors = Vec::new();
        let mut actors = Vec::new();
        let mut writers = Vec::new();

        for credit in film.persons.iter().flatten() {
            let Some(group) = RoleGroup::from_role(&credit.role) else {
                continue;
            };
            let person = NamedRef {
                id: credit.id.to_string(),
                name: credit.name.clone(),
            };
            match group {
                RoleGroup::Directors => directors.push(person),
                RoleGroup::Actors => actors.push(person),
                RoleGroup::Writers => writers.push(person),
            }
        }

        let names = |people: &[NamedRef]| people.iter().map(|p| p.name.clone()).collect();

        MovieDocument {
            id: film.id.to_string(),
            title: film.title.clone(),
            description: film.description.clone(),
            rating: film.rating,
            kind: film.kind.clone(),
            genres: film
                .genres
                .iter()
                .flatten()
                .map(|genre| NamedRef {
                    id: genre.id.to_string(),
                    name: genre.name.clone(),
                })
                .collect(),
            directors_names: names(&directors),
            actors_names: names(&actors),
            writers_names: names(&writers),
            directors,
            actors,
            writers,
        }
    }

    fn genre(genre: &GenreRow) -> GenreDocument {
        GenreDocument {
            id: genre.id.to_string(),
            name: genre.name.clone(),
            description: genre.description.clone(),
            created: genre.created,
            modified: genre.modified,
        }
    }

    fn person(person: &PersonRow) -> PersonDocument {
        PersonDocument {
            id: person.id.to_string(),
            full_name: person.full_name.clone(),
            created: person.created,
            modified: person.modified,
        }
    }
}

/// Fields of a movie document that depend on linked genres and persons.
///
/// Used for partial refreshes after a change in a related or link table.
pub fn relation_fields(document: &MovieDocument) -> Map<String, Value> {
    let mut fields = Map::new();
    fields.insert("genres".to_string(), json!(document.genres));
    fields.insert("directors".to_string(), json!(document.directors));
    fields.insert("actors".to_string(), json!(document.actors));
    fields.insert("writers".to_string(), json!(document.writers));
    fields.insert("directors_names".to_string(), json!(document.directors_names));
    fields.insert("actors_names".to_string(), json!(document.actors_names));
    fields.insert("writers_names".to_string(), json!(document.writers_names));
    fields
}
