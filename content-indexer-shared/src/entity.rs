//! Entity kinds and source table classification.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The kinds of documents kept in the search engine.
///
/// Each kind owns one index and one pair of cursor keys in the state store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    /// Film works, the root documents.
    Movies,
    /// Genres.
    Genres,
    /// Persons (actors, directors, writers, ...).
    Persons,
}

impl EntityKind {
    /// All kinds in catch-up order.
    pub const ALL: [EntityKind; 3] = [EntityKind::Movies, EntityKind::Genres, EntityKind::Persons];

    /// Name of the search index holding documents of this kind.
    pub fn index_name(&self) -> &'static str {
        match self {
            EntityKind::Movies => "movies",
            EntityKind::Genres => "genres",
            EntityKind::Persons => "persons",
        }
    }

    /// Prefix of the cursor keys in the state store.
    pub fn state_prefix(&self) -> &'static str {
        self.index_name()
    }

    /// State key of the last seen timestamp.
    pub fn time_key(&self) -> String {
        format!("{}_time", self.state_prefix())
    }

    /// State key of the ids emitted at the last seen timestamp.
    pub fn ids_key(&self) -> String {
        format!("{}_ids", self.state_prefix())
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.index_name())
    }
}

/// Relations through which a changed row can be linked to film works.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Relation {
    /// A genre row; linked films are found through `genre_film_work`.
    Genre,
    /// A person row; linked films are found through `person_film_work`.
    Person,
    /// A `genre_film_work` link row.
    GenreFilmWork,
    /// A `person_film_work` link row.
    PersonFilmWork,
}

impl Relation {
    /// Source table of the relation.
    pub fn table(&self) -> &'static str {
        match self {
            Relation::Genre => "genre",
            Relation::Person => "person",
            Relation::GenreFilmWork => "genre_film_work",
            Relation::PersonFilmWork => "person_film_work",
        }
    }

    /// The entity kind with its own index, for related-entity tables.
    pub fn own_kind(&self) -> Option<EntityKind> {
        match self {
            Relation::Genre => Some(EntityKind::Genres),
            Relation::Person => Some(EntityKind::Persons),
            Relation::GenreFilmWork | Relation::PersonFilmWork => None,
        }
    }
}

/// Classification of a table named in a change notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKind {
    /// The root entity table (`film_work`).
    Root,
    /// A related entity or join table.
    Linked(Relation),
}

impl TableKind {
    /// Classify a table name. Schema qualifiers (`content.genre`) are accepted.
    ///
    /// Returns `None` for tables the indexer does not track.
    pub fn from_table(table: &str) -> Option<Self> {
        let name = table.rsplit('.').next().unwrap_or(table);
        match name {
            "film_work" => Some(TableKind::Root),
            "genre" => Some(TableKind::Linked(Relation::Genre)),
            "person" => Some(TableKind::Linked(Relation::Person)),
            "genre_film_work" => Some(TableKind::Linked(Relation::GenreFilmWork)),
            "person_film_work" => Some(TableKind::Linked(Relation::PersonFilmWork)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_keys() {
        assert_eq!(EntityKind::Movies.time_key(), "movies_time");
        assert_eq!(EntityKind::Persons.ids_key(), "persons_ids");
    }

    #[test]
    fn test_table_classification() {
        assert_eq!(TableKind::from_table("film_work"), Some(TableKind::Root));
        assert_eq!(
            TableKind::from_table("content.genre_film_work"),
            Some(TableKind::Linked(Relation::GenreFilmWork))
        );
        assert_eq!(TableKind::from_table("django_session"), None);
    }

    #[test]
    fn test_relation_own_kind() {
        assert_eq!(Relation::Genre.own_kind(), Some(EntityKind::Genres));
        assert_eq!(Relation::PersonFilmWork.own_kind(), None);
    }
}
