//! Error types for the content indexer repository.

mod readiness_error;
mod search_error;
mod source_error;
mod state_error;

pub use readiness_error::ReadinessError;
pub use search_error::SearchError;
pub use source_error::SourceError;
pub use state_error::StateError;
