//! In-memory fakes of the content database and the search engine.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use content_indexer_pipeline::{
    ChangeListener, CursorStore, Extractor, ExtractorConfig, Pipeline, SearchLoader,
};
use content_indexer_repository::{
    BatchRequest, BulkIndexSummary, BulkItemResult, ChangeChannel, ContentSource,
    InMemoryStateStore, IndexedDocument, SchemaApplier, SchemaOutcome, SearchEngineClient,
    SearchError, SourceError, UpdateDocumentRequest,
};
use content_indexer_shared::{
    EntityKind, FilmWorkRow, GenreRef, GenreRow, PersonCredit, PersonRow, Relation, SourceRow,
};
use serde_json::Value;
use uuid::Uuid;

pub fn at(seconds: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + seconds, 0).unwrap()
}

#[derive(Debug, Clone)]
pub struct Film {
    pub id: Uuid,
    pub title: String,
    pub rating: Option<f64>,
    pub created: DateTime<Utc>,
    pub modified: Option<DateTime<Utc>>,
}

#[derive(Debug, Default)]
struct Tables {
    films: BTreeMap<Uuid, Film>,
    genres: BTreeMap<Uuid, GenreRow>,
    persons: BTreeMap<Uuid, PersonRow>,
    /// link id -> (film id, genre id)
    genre_links: BTreeMap<Uuid, (Uuid, Uuid)>,
    /// link id -> (film id, person id, role)
    person_links: BTreeMap<Uuid, (Uuid, Uuid, String)>,
}

/// Content database kept in memory, queried with the same keyset rules as
/// the Postgres source.
#[derive(Default)]
pub struct FakeDatabase {
    tables: Mutex<Tables>,
    pub batch_queries: AtomicUsize,
    pub point_queries: AtomicUsize,
}

impl FakeDatabase {
    pub fn add_film(&self, title: &str, created: DateTime<Utc>) -> Uuid {
        let id = Uuid::new_v4();
        self.tables.lock().unwrap().films.insert(
            id,
            Film {
                id,
                title: title.to_string(),
                rating: None,
                created,
                modified: None,
            },
        );
        id
    }

    pub fn touch_film(&self, id: Uuid, title: &str, modified: DateTime<Utc>) {
        let mut tables = self.tables.lock().unwrap();
        if let Some(film) = tables.films.get_mut(&id) {
            film.title = title.to_string();
            film.modified = Some(modified);
        }
    }

    pub fn remove_film(&self, id: Uuid) {
        let mut tables = self.tables.lock().unwrap();
        tables.films.remove(&id);
        tables.genre_links.retain(|_, (film, _)| *film != id);
        tables.person_links.retain(|_, (film, _, _)| *film != id);
    }

    pub fn add_genre(&self, name: &str, created: DateTime<Utc>) -> Uuid {
        let id = Uuid::new_v4();
        self.tables.lock().unwrap().genres.insert(
            id,
            GenreRow {
                id,
                name: name.to_string(),
                description: None,
                created,
                modified: None,
            },
        );
        id
    }

    pub fn rename_genre(&self, id: Uuid, name: &str, modified: DateTime<Utc>) {
        let mut tables = self.tables.lock().unwrap();
        if let Some(genre) = tables.genres.get_mut(&id) {
            genre.name = name.to_string();
            genre.modified = Some(modified);
        }
    }

    pub fn add_person(&self, full_name: &str, created: DateTime<Utc>) -> Uuid {
        let id = Uuid::new_v4();
        self.tables.lock().unwrap().persons.insert(
            id,
            PersonRow {
                id,
                full_name: full_name.to_string(),
                created,
                modified: None,
            },
        );
        id
    }

    pub fn link_genre(&self, film_id: Uuid, genre_id: Uuid) -> Uuid {
        let id = Uuid::new_v4();
        self.tables
            .lock()
            .unwrap()
            .genre_links
            .insert(id, (film_id, genre_id));
        id
    }

    pub fn link_person(&self, film_id: Uuid, person_id: Uuid, role: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.tables
            .lock()
            .unwrap()
            .person_links
            .insert(id, (film_id, person_id, role.to_string()));
        id
    }

    fn film_row(tables: &Tables, film: &Film) -> FilmWorkRow {
        let genres: Vec<GenreRef> = tables
            .genre_links
            .values()
            .filter(|(f, _)| *f == film.id)
            .filter_map(|(_, g)| tables.genres.get(g))
            .map(|g| GenreRef {
                id: g.id,
                name: g.name.clone(),
            })
            .collect();
        let persons: Vec<PersonCredit> = tables
            .person_links
            .values()
            .filter(|(f, _, _)| *f == film.id)
            .filter_map(|(_, p, role)| {
                tables.persons.get(p).map(|p| PersonCredit {
                    id: p.id,
                    name: p.full_name.clone(),
                    role: role.clone(),
                })
            })
            .collect();

        FilmWorkRow {
            id: film.id,
            title: film.title.clone(),
            description: None,
            rating: film.rating,
            kind: "movie".to_string(),
            created: film.created,
            modified: film.modified,
            genres: (!genres.is_empty()).then_some(genres),
            persons: (!persons.is_empty()).then_some(persons),
        }
    }

    fn rows(&self, kind: EntityKind) -> Vec<SourceRow> {
        let tables = self.tables.lock().unwrap();
        match kind {
            EntityKind::Movies => tables
                .films
                .values()
                .map(|film| SourceRow::Movie(Self::film_row(&tables, film)))
                .collect(),
            EntityKind::Genres => tables.genres.values().cloned().map(SourceRow::Genre).collect(),
            EntityKind::Persons => tables
                .persons
                .values()
                .cloned()
                .map(SourceRow::Person)
                .collect(),
        }
    }
}

#[async_trait]
impl ContentSource for FakeDatabase {
    async fn fetch_batch(
        &self,
        kind: EntityKind,
        request: &BatchRequest,
    ) -> Result<Vec<SourceRow>, SourceError> {
        self.batch_queries.fetch_add(1, Ordering::SeqCst);
        let mut rows: Vec<SourceRow> = self
            .rows(kind)
            .into_iter()
            .filter(|row| {
                let ts = row.updated_or_created();
                ts > request.since || (ts == request.since && !request.exclude_ids.contains(&row.id()))
            })
            .collect();
        rows.sort_by_key(|row| (row.updated_or_created(), row.id()));
        rows.truncate(request.limit);
        Ok(rows)
    }

    async fn fetch_one(&self, kind: EntityKind, id: Uuid) -> Result<Option<SourceRow>, SourceError> {
        self.point_queries.fetch_add(1, Ordering::SeqCst);
        Ok(self.rows(kind).into_iter().find(|row| row.id() == id))
    }

    async fn linked_film_ids(&self, relation: Relation, id: Uuid) -> Result<Vec<Uuid>, SourceError> {
        let tables = self.tables.lock().unwrap();
        let ids: Vec<Uuid> = match relation {
            Relation::Genre => tables
                .genre_links
                .values()
                .filter(|(_, g)| *g == id)
                .map(|(f, _)| *f)
                .collect(),
            Relation::Person => tables
                .person_links
                .values()
                .filter(|(_, p, _)| *p == id)
                .map(|(f, _, _)| *f)
                .collect(),
            Relation::GenreFilmWork => tables.genre_links.get(&id).map(|(f, _)| *f).into_iter().collect(),
            Relation::PersonFilmWork => tables
                .person_links
                .get(&id)
                .map(|(f, _, _)| *f)
                .into_iter()
                .collect(),
        };
        Ok(ids)
    }
}

/// Search engine kept in memory.
#[derive(Default)]
pub struct FakeSearchEngine {
    docs: Mutex<HashMap<(String, String), Value>>,
    pub bulk_requests: AtomicUsize,
    pub single_writes: AtomicUsize,
}

impl FakeSearchEngine {
    pub fn doc(&self, index: &str, id: Uuid) -> Option<Value> {
        self.docs
            .lock()
            .unwrap()
            .get(&(index.to_string(), id.to_string()))
            .cloned()
    }

    pub fn count(&self, index: &str) -> usize {
        self.docs
            .lock()
            .unwrap()
            .keys()
            .filter(|(i, _)| i == index)
            .count()
    }

    pub fn snapshot(&self) -> HashMap<(String, String), Value> {
        self.docs.lock().unwrap().clone()
    }
}

#[async_trait]
impl SearchEngineClient for FakeSearchEngine {
    async fn bulk_index(
        &self,
        index: &str,
        documents: &[IndexedDocument],
    ) -> Result<BulkIndexSummary, SearchError> {
        self.bulk_requests.fetch_add(1, Ordering::SeqCst);
        let mut docs = self.docs.lock().unwrap();
        let results = documents
            .iter()
            .map(|doc| {
                docs.insert((index.to_string(), doc.id.clone()), doc.source.clone());
                BulkItemResult {
                    id: doc.id.clone(),
                    success: true,
                    error: None,
                }
            })
            .collect();
        Ok(BulkIndexSummary::from_results(results))
    }

    async fn index_document(&self, index: &str, document: &IndexedDocument) -> Result<(), SearchError> {
        self.single_writes.fetch_add(1, Ordering::SeqCst);
        self.docs
            .lock()
            .unwrap()
            .insert((index.to_string(), document.id.clone()), document.source.clone());
        Ok(())
    }

    async fn update_document(
        &self,
        index: &str,
        request: &UpdateDocumentRequest,
    ) -> Result<(), SearchError> {
        self.single_writes.fetch_add(1, Ordering::SeqCst);
        let mut docs = self.docs.lock().unwrap();
        match docs.get_mut(&(index.to_string(), request.id.clone())) {
            Some(Value::Object(existing)) => {
                for (key, value) in &request.fields {
                    existing.insert(key.clone(), value.clone());
                }
                Ok(())
            }
            _ => Err(SearchError::not_found(index, &request.id)),
        }
    }

    async fn delete_document(&self, index: &str, id: &str) -> Result<(), SearchError> {
        self.single_writes.fetch_add(1, Ordering::SeqCst);
        self.docs
            .lock()
            .unwrap()
            .remove(&(index.to_string(), id.to_string()));
        Ok(())
    }

    async fn get_document(&self, index: &str, id: &str) -> Result<Option<Value>, SearchError> {
        Ok(self
            .docs
            .lock()
            .unwrap()
            .get(&(index.to_string(), id.to_string()))
            .cloned())
    }
}

#[async_trait]
impl SchemaApplier for FakeSearchEngine {
    async fn apply_schema(&self, _index: &str, _schema: &Value) -> Result<SchemaOutcome, SearchError> {
        Ok(SchemaOutcome::Created)
    }
}

/// Channel that never delivers anything.
pub struct SilentChannel;

#[async_trait]
impl ChangeChannel for SilentChannel {
    async fn subscribe(&mut self, _channel: &str) -> Result<(), SourceError> {
        Ok(())
    }

    async fn poll(&mut self, timeout: std::time::Duration) -> Result<Option<String>, SourceError> {
        tokio::time::sleep(timeout).await;
        Ok(None)
    }

    async fn close(&mut self) {}
}

/// A wired pipeline over fakes.
pub struct Harness {
    pub db: Arc<FakeDatabase>,
    pub search: Arc<FakeSearchEngine>,
    pub state: Arc<InMemoryStateStore>,
    pub extractor: Arc<Extractor>,
    pub loader: Arc<SearchLoader>,
}

impl Harness {
    pub fn new(batch_size: usize) -> Self {
        Self::with_state(batch_size, Arc::new(InMemoryStateStore::new("etl_state:")))
    }

    /// Build a harness sharing an existing state store, as after a restart.
    pub fn with_state(batch_size: usize, state: Arc<InMemoryStateStore>) -> Self {
        let db = Arc::new(FakeDatabase::default());
        let search = Arc::new(FakeSearchEngine::default());
        Self::assemble(db, search, state, batch_size)
    }

    pub fn assemble(
        db: Arc<FakeDatabase>,
        search: Arc<FakeSearchEngine>,
        state: Arc<InMemoryStateStore>,
        batch_size: usize,
    ) -> Self {
        let extractor = Arc::new(Extractor::with_config(
            db.clone(),
            ExtractorConfig {
                batch_size,
                ..Default::default()
            },
        ));
        let loader = Arc::new(SearchLoader::new(search.clone(), search.clone()));
        Self {
            db,
            search,
            state,
            extractor,
            loader,
        }
    }

    pub fn cursors(&self) -> CursorStore {
        CursorStore::new(self.state.clone())
    }

    pub fn listener(&self) -> ChangeListener {
        ChangeListener::new(Box::new(SilentChannel), self.extractor.clone(), self.loader.clone())
    }

    pub fn pipeline(&self) -> Pipeline {
        Pipeline::new(
            self.extractor.clone(),
            self.loader.clone(),
            self.cursors(),
            self.listener(),
        )
    }
}
