//! Error types for the content indexer pipeline.

use content_indexer_repository::{ReadinessError, SearchError, SourceError, StateError};
use content_indexer_shared::MalformedNotification;
use thiserror::Error;

/// Errors that can occur in the pipeline.
///
/// Repository errors are classified on conversion: connection failures of
/// any backend become [`PipelineError::TransientConnectivity`] so that retry
/// policies only need to look at one variant.
#[derive(Error, Debug, Clone)]
pub enum PipelineError {
    /// A backend was unreachable; retrying may succeed.
    #[error("Transient connectivity error: {0}")]
    TransientConnectivity(String),

    /// A change notification could not be decoded.
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    /// A document or row does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Startup configuration is unusable.
    #[error("Fatal configuration error: {0}")]
    FatalConfig(String),

    /// Error from the search engine.
    #[error("Search error: {0}")]
    Search(SearchError),

    /// Error from the content database.
    #[error("Source error: {0}")]
    Source(SourceError),

    /// Error from the state store.
    #[error("State error: {0}")]
    State(StateError),

    /// A dependency did not become ready.
    #[error("Readiness error: {0}")]
    Readiness(#[from] ReadinessError),

    /// The pipeline was asked to stop.
    #[error("Pipeline cancelled")]
    Cancelled,
}

impl PipelineError {
    /// Create a transient connectivity error.
    pub fn transient(msg: impl Into<String>) -> Self {
        Self::TransientConnectivity(msg.into())
    }

    /// Create a fatal configuration error.
    pub fn fatal_config(msg: impl Into<String>) -> Self {
        Self::FatalConfig(msg.into())
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, Self::TransientConnectivity(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<SearchError> for PipelineError {
    fn from(err: SearchError) -> Self {
        match err {
            SearchError::ConnectionError(msg) => Self::TransientConnectivity(msg),
            SearchError::NotFound(what) => Self::NotFound(what),
            other => Self::Search(other),
        }
    }
}

impl From<SourceError> for PipelineError {
    fn from(err: SourceError) -> Self {
        match err {
            SourceError::ConnectionError(msg) => Self::TransientConnectivity(msg),
            other => Self::Source(other),
        }
    }
}

impl From<StateError> for PipelineError {
    fn from(err: StateError) -> Self {
        match err {
            StateError::ConnectionError(msg) => Self::TransientConnectivity(msg),
            other => Self::State(other),
        }
    }
}

impl From<MalformedNotification> for PipelineError {
    fn from(err: MalformedNotification) -> Self {
        Self::MalformedPayload(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_errors_become_transient() {
        assert!(PipelineError::from(SearchError::connection("refused")).is_transient());
        assert!(PipelineError::from(SourceError::connection("reset")).is_transient());
        assert!(PipelineError::from(StateError::connection("down")).is_transient());
    }

    #[test]
    fn test_not_found_is_preserved() {
        let err = PipelineError::from(SearchError::not_found("movies", "f1"));
        assert!(err.is_not_found());
        assert!(!err.is_transient());
    }

    #[test]
    fn test_query_errors_are_not_transient() {
        let err = PipelineError::from(SourceError::query("syntax error"));
        assert!(matches!(err, PipelineError::Source(_)));
        assert!(!err.is_transient());
    }
}
