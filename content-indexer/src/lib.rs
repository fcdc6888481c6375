//! # Content Indexer
//!
//! Main library for the content indexer.
//!
//! This crate provides the entry point configuration and dependency wiring
//! for running the content indexer pipeline.

pub mod config;

pub use config::{Dependencies, LogFormat, Settings, StateBackend};

use thiserror::Error;

/// Errors that can occur during indexer initialization or execution.
#[derive(Error, Debug)]
pub enum IndexingError {
    /// Unusable configuration; the process cannot start.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Pipeline error.
    #[error("Pipeline error: {0}")]
    PipelineError(#[from] content_indexer_pipeline::PipelineError),

    /// Search error.
    #[error("Search error: {0}")]
    SearchError(#[from] content_indexer_repository::SearchError),

    /// Content database error.
    #[error("Source error: {0}")]
    SourceError(#[from] content_indexer_repository::SourceError),

    /// State store error.
    #[error("State error: {0}")]
    StateError(#[from] content_indexer_repository::StateError),

    /// A dependency did not become ready.
    #[error("Readiness error: {0}")]
    ReadinessError(#[from] content_indexer_repository::ReadinessError),
}

impl IndexingError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }
}
