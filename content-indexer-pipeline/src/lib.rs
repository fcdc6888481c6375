//! # Content Indexer Pipeline
//!
//! This crate provides the pipeline components that keep the search indices
//! in sync with the Postgres content database.
//!
//! ## Architecture
//!
//! The pipeline follows the Extractor-Transformer-Loader pattern:
//!
//! 1. **Extractor**: Reads changed rows in cursor order
//! 2. **Transformer**: Maps rows into search documents
//! 3. **Loader**: Writes documents into the search engine
//! 4. **ChangeListener**: Applies change notifications one by one
//! 5. **Pipeline**: Runs catch-up per entity kind, then the listener

pub mod errors;
pub mod extractor;
pub mod listener;
pub mod loader;
pub mod orchestrator;
pub mod retry;
pub mod state;
pub mod transformer;

pub use errors::PipelineError;
pub use extractor::{BatchReader, Extractor, ExtractorConfig};
pub use listener::{ChangeListener, ChangeOutcome, ListenerConfig, ListenerState};
pub use loader::{LoadReport, LoaderConfig, RefreshOutcome, SearchLoader};
pub use orchestrator::{CatchUpReport, KindReport, Pipeline, PipelineConfig};
pub use retry::RetryPolicy;
pub use state::CursorStore;
pub use transformer::{RoleGroup, Transformer};
