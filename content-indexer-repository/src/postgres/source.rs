//! Postgres content source.

use async_trait::async_trait;
use content_indexer_shared::{
    EntityKind, FilmWorkRow, GenreRef, GenreRow, PersonCredit, PersonRow, Relation, SourceRow,
};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::types::Json;
use sqlx::Row;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::config::PostgresConfig;
use crate::errors::SourceError;
use crate::interfaces::{ContentSource, ReadinessProbe};
use crate::postgres::queries;
use crate::types::BatchRequest;

/// Reads film works, genres and persons from the `content` schema.
#[derive(Clone)]
pub struct PostgresSource {
    pool: PgPool,
}

impl PostgresSource {
    /// Create a source with a lazily connecting pool.
    ///
    /// Connections are opened on first use, so this never fails on an
    /// unreachable database; wait with [`ReadinessProbe::wait_until_ready`].
    pub fn connect_lazy(config: &PostgresConfig) -> Self {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect_lazy_with(config.connect_options());

        info!(
            host = %config.host,
            port = config.port,
            database = %config.database,
            "Created Postgres pool"
        );

        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Close every pooled connection.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Install the change notification triggers publishing to `channel`.
    ///
    /// Idempotent: functions are replaced and triggers recreated.
    #[instrument(skip(self))]
    pub async fn install_triggers(&self, channel: &str) -> Result<(), SourceError> {
        validate_channel_name(channel)?;
        let sql = queries::TRIGGERS.replace("{channel}", channel);
        sqlx::raw_sql(&sql).execute(&self.pool).await?;
        info!("Installed change notification triggers");
        Ok(())
    }

    async fn film_ids(&self, query: &str, id: Uuid) -> Result<Vec<Uuid>, SourceError> {
        let rows = sqlx::query(query).bind(id).fetch_all(&self.pool).await?;
        rows.iter()
            .map(|row| row.try_get::<Uuid, _>("film_work_id").map_err(SourceError::from))
            .collect()
    }
}

/// Reject anything but a plain lowercase identifier.
///
/// The channel name is interpolated into trigger DDL, so it cannot be bound
/// as a parameter.
pub fn validate_channel_name(channel: &str) -> Result<(), SourceError> {
    let mut chars = channel.chars();
    let valid_start = chars
        .next()
        .is_some_and(|c| c.is_ascii_lowercase() || c == '_');
    let valid_rest = chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');

    if valid_start && valid_rest && channel.len() <= 63 {
        Ok(())
    } else {
        Err(SourceError::invalid_input(format!(
            "Invalid notification channel name: {:?}",
            channel
        )))
    }
}

fn film_work_from_row(row: &PgRow) -> Result<SourceRow, SourceError> {
    let genres: Option<Json<Vec<GenreRef>>> = row.try_get("genres")?;
    let persons: Option<Json<Vec<PersonCredit>>> = row.try_get("persons")?;

    Ok(SourceRow::Movie(FilmWorkRow {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        rating: row.try_get("rating")?,
        kind: row.try_get("type")?,
        created: row.try_get("created")?,
        modified: row.try_get("modified")?,
        genres: genres.map(|g| g.0),
        persons: persons.map(|p| p.0),
    }))
}

fn genre_from_row(row: &PgRow) -> Result<SourceRow, SourceError> {
    Ok(SourceRow::Genre(GenreRow {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        created: row.try_get("created")?,
        modified: row.try_get("modified")?,
    }))
}

fn person_from_row(row: &PgRow) -> Result<SourceRow, SourceError> {
    Ok(SourceRow::Person(PersonRow {
        id: row.try_get("id")?,
        full_name: row.try_get("full_name")?,
        created: row.try_get("created")?,
        modified: row.try_get("modified")?,
    }))
}

type RowMapper = fn(&PgRow) -> Result<SourceRow, SourceError>;

fn batch_query(kind: EntityKind) -> (&'static str, RowMapper) {
    match kind {
        EntityKind::Movies => (queries::FILM_WORK_BATCH, film_work_from_row),
        EntityKind::Genres => (queries::GENRE_BATCH, genre_from_row),
        EntityKind::Persons => (queries::PERSON_BATCH, person_from_row),
    }
}

fn point_query(kind: EntityKind) -> (&'static str, RowMapper) {
    match kind {
        EntityKind::Movies => (queries::FILM_WORK_BY_ID, film_work_from_row),
        EntityKind::Genres => (queries::GENRE_BY_ID, genre_from_row),
        EntityKind::Persons => (queries::PERSON_BY_ID, person_from_row),
    }
}

#[async_trait]
impl ContentSource for PostgresSource {
    #[instrument(skip(self, request), fields(kind = %kind, since = %request.since, excluded = request.exclude_ids.len()))]
    async fn fetch_batch(
        &self,
        kind: EntityKind,
        request: &BatchRequest,
    ) -> Result<Vec<SourceRow>, SourceError> {
        let (sql, map_row) = batch_query(kind);

        let rows = sqlx::query(sql)
            .bind(request.since)
            .bind(&request.exclude_ids)
            .bind(request.limit as i64)
            .fetch_all(&self.pool)
            .await?;

        debug!(count = rows.len(), "Fetched batch");
        rows.iter().map(map_row).collect()
    }

    async fn fetch_one(
        &self,
        kind: EntityKind,
        id: Uuid,
    ) -> Result<Option<SourceRow>, SourceError> {
        let (sql, map_row) = point_query(kind);

        let row = sqlx::query(sql).bind(id).fetch_optional(&self.pool).await?;
        row.as_ref().map(map_row).transpose()
    }

    async fn linked_film_ids(
        &self,
        relation: Relation,
        id: Uuid,
    ) -> Result<Vec<Uuid>, SourceError> {
        let sql = match relation {
            Relation::Genre => queries::FILMS_BY_GENRE,
            Relation::Person => queries::FILMS_BY_PERSON,
            Relation::GenreFilmWork => queries::FILM_BY_GENRE_LINK,
            Relation::PersonFilmWork => queries::FILM_BY_PERSON_LINK,
        };
        self.film_ids(sql, id).await
    }
}

#[async_trait]
impl ReadinessProbe for PostgresSource {
    fn component(&self) -> &'static str {
        "database"
    }

    async fn is_ready(&self) -> bool {
        match sqlx::query("SELECT 1").execute(&self.pool).await {
            Ok(_) => true,
            Err(e) => {
                debug!(error = %e, "Database ping failed");
                false
            }
        }
    }
}
