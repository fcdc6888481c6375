//! Relational source trait definition.

use async_trait::async_trait;
use content_indexer_shared::{EntityKind, Relation, SourceRow};
use uuid::Uuid;

use crate::errors::SourceError;
use crate::types::BatchRequest;

/// Read access to the relational content tables.
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Fetch one page of rows of `kind` changed at or after `request.since`.
    ///
    /// Rows are ordered by `(COALESCE(modified, created), id)`. Movie rows
    /// carry their genres and credited people.
    async fn fetch_batch(
        &self,
        kind: EntityKind,
        request: &BatchRequest,
    ) -> Result<Vec<SourceRow>, SourceError>;

    /// Fetch a single row by id, or `None` if it no longer exists.
    async fn fetch_one(&self, kind: EntityKind, id: Uuid)
        -> Result<Option<SourceRow>, SourceError>;

    /// Film works affected by a change to the row `id` of `relation`.
    ///
    /// For genres and persons these are the films the row is linked to; for
    /// link tables it is the film referenced by the link row.
    async fn linked_film_ids(
        &self,
        relation: Relation,
        id: Uuid,
    ) -> Result<Vec<Uuid>, SourceError>;
}
