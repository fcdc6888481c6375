//! In-memory implementations for tests and single-process runs.

mod state_store;

pub use state_store::InMemoryStateStore;
