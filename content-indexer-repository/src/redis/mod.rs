//! Redis implementation of the state store.

mod state_store;

pub use state_store::RedisStateStore;
