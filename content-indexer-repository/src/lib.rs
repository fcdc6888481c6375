//! # Content Indexer Repository
//!
//! This crate provides traits and implementations for the external stores
//! the content indexer talks to: the search engine, the Postgres content
//! database with its change notifications, and the cursor state store.

pub mod config;
pub mod errors;
pub mod interfaces;
pub mod memory;
pub mod opensearch;
pub mod postgres;
pub mod redis;
pub mod types;

pub use config::{PostgresConfig, RedisConfig};
pub use errors::{ReadinessError, SearchError, SourceError, StateError};
pub use interfaces::{
    ChangeChannel, ContentSource, ReadinessProbe, SchemaApplier, SearchEngineClient, StateStore,
};
pub use memory::InMemoryStateStore;
pub use opensearch::{IndexSchemas, OpenSearchClient};
pub use postgres::{PgChangeChannel, PostgresSource};
pub use types::{
    BatchRequest, BulkIndexSummary, BulkItemResult, IndexedDocument, SchemaOutcome,
    UpdateDocumentRequest,
};
pub use crate::redis::RedisStateStore;
