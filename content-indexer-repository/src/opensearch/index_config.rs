//! Index settings and mappings for the content indices.
//!
//! Each entity kind has a built-in schema. A schema directory may override
//! any of them with a `{index}_schema.json` file.

use std::collections::HashMap;
use std::path::Path;

use content_indexer_shared::EntityKind;
use serde_json::{json, Value};
use tracing::info;

use crate::errors::SearchError;

/// Analysis settings shared by all content indices.
///
/// Text is matched in both English and Russian: stop words are removed and
/// words are stemmed for each language.
fn analysis_settings() -> Value {
    json!({
        "refresh_interval": "1s",
        "analysis": {
            "filter": {
                "english_stop": { "type": "stop", "stopwords": "_english_" },
                "english_stemmer": { "type": "stemmer", "language": "english" },
                "english_possessive_stemmer": { "type": "stemmer", "language": "possessive_english" },
                "russian_stop": { "type": "stop", "stopwords": "_russian_" },
                "russian_stemmer": { "type": "stemmer", "language": "russian" }
            },
            "analyzer": {
                "ru_en": {
                    "tokenizer": "standard",
                    "filter": [
                        "lowercase",
                        "english_stop",
                        "english_stemmer",
                        "english_possessive_stemmer",
                        "russian_stop",
                        "russian_stemmer"
                    ]
                }
            }
        }
    })
}

fn named_ref_mapping() -> Value {
    json!({
        "type": "nested",
        "dynamic": "strict",
        "properties": {
            "id": { "type": "keyword" },
            "name": { "type": "text", "analyzer": "ru_en" }
        }
    })
}

/// Settings and mappings of the `movies` index.
pub fn movies_index_settings() -> Value {
    json!({
        "settings": analysis_settings(),
        "mappings": {
            "dynamic": "strict",
            "properties": {
                "id": { "type": "keyword" },
                "rating": { "type": "float" },
                "type": { "type": "keyword" },
                "genres": named_ref_mapping(),
                "title": {
                    "type": "text",
                    "analyzer": "ru_en",
                    "fields": { "raw": { "type": "keyword" } }
                },
                "description": { "type": "text", "analyzer": "ru_en" },
                "directors_names": { "type": "text", "analyzer": "ru_en" },
                "actors_names": { "type": "text", "analyzer": "ru_en" },
                "writers_names": { "type": "text", "analyzer": "ru_en" },
                "directors": named_ref_mapping(),
                "actors": named_ref_mapping(),
                "writers": named_ref_mapping()
            }
        }
    })
}

/// Settings and mappings of the `genres` index.
pub fn genres_index_settings() -> Value {
    json!({
        "settings": analysis_settings(),
        "mappings": {
            "dynamic": "strict",
            "properties": {
                "id": { "type": "keyword" },
                "name": {
                    "type": "text",
                    "analyzer": "ru_en",
                    "fields": { "raw": { "type": "keyword" } }
                },
                "description": { "type": "text", "analyzer": "ru_en" },
                "created": { "type": "date" },
                "modified": { "type": "date" }
            }
        }
    })
}

/// Settings and mappings of the `persons` index.
pub fn persons_index_settings() -> Value {
    json!({
        "settings": analysis_settings(),
        "mappings": {
            "dynamic": "strict",
            "properties": {
                "id": { "type": "keyword" },
                "full_name": {
                    "type": "text",
                    "analyzer": "ru_en",
                    "fields": { "raw": { "type": "keyword" } }
                },
                "created": { "type": "date" },
                "modified": { "type": "date" }
            }
        }
    })
}

/// Built-in schema of the index holding `kind`.
pub fn builtin_index_settings(kind: EntityKind) -> Value {
    match kind {
        EntityKind::Movies => movies_index_settings(),
        EntityKind::Genres => genres_index_settings(),
        EntityKind::Persons => persons_index_settings(),
    }
}

/// The schema to apply for every entity kind.
#[derive(Debug, Clone)]
pub struct IndexSchemas {
    schemas: HashMap<EntityKind, Value>,
}

impl Default for IndexSchemas {
    fn default() -> Self {
        Self::builtin()
    }
}

impl IndexSchemas {
    /// Built-in schemas only.
    pub fn builtin() -> Self {
        Self {
            schemas: EntityKind::ALL
                .iter()
                .map(|kind| (*kind, builtin_index_settings(*kind)))
                .collect(),
        }
    }

    /// Built-in schemas overridden by `{dir}/{index}_schema.json` where present.
    ///
    /// # Errors
    ///
    /// * `SearchError::SchemaError` - If `dir` is not a readable directory, or
    ///   an override file exists but is not a JSON object
    pub fn from_dir(dir: &Path) -> Result<Self, SearchError> {
        if !dir.is_dir() {
            return Err(SearchError::schema(format!(
                "Schema directory {} does not exist",
                dir.display()
            )));
        }

        let mut schemas = Self::builtin();
        for kind in EntityKind::ALL {
            let path = dir.join(format!("{}_schema.json", kind.index_name()));
            if !path.exists() {
                continue;
            }

            let raw = std::fs::read_to_string(&path)
                .map_err(|e| SearchError::schema(format!("{}: {}", path.display(), e)))?;
            let schema: Value = serde_json::from_str(&raw)
                .map_err(|e| SearchError::schema(format!("{}: {}", path.display(), e)))?;
            if !schema.is_object() {
                return Err(SearchError::schema(format!(
                    "{}: schema must be a JSON object",
                    path.display()
                )));
            }

            info!(index = kind.index_name(), path = %path.display(), "Loaded index schema override");
            schemas.schemas.insert(kind, schema);
        }

        Ok(schemas)
    }

    pub fn get(&self, kind: EntityKind) -> Value {
        self.schemas
            .get(&kind)
            .cloned()
            .unwrap_or_else(|| builtin_index_settings(kind))
    }
}
