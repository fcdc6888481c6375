//! OpenSearch implementation of the search engine client.
//!
//! The same client works against Elasticsearch-compatible endpoints for the
//! document, bulk, index and cluster health APIs used here.

mod client;
mod index_config;

pub use client::OpenSearchClient;
pub use index_config::{builtin_index_settings, IndexSchemas};
