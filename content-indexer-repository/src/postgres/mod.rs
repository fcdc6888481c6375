//! Postgres implementation of the content source and change channel.

mod change_channel;
mod queries;
mod source;

pub use change_channel::PgChangeChannel;
pub use source::{validate_channel_name, PostgresSource};
