//! Interface definitions for the repository backends.
//!
//! These traits allow dependency injection and swappable implementations:
//! the pipeline only talks to trait objects, and tests substitute in-memory
//! fakes.

mod capabilities;
mod change_channel;
mod content_source;
mod search_engine_client;
mod state_store;

pub use capabilities::{ReadinessProbe, SchemaApplier};
pub use change_channel::ChangeChannel;
pub use content_source::ContentSource;
pub use search_engine_client::SearchEngineClient;
pub use state_store::StateStore;
pub(crate) use state_store::namespaced;
