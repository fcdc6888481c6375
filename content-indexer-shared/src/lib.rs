//! # Content Indexer Shared
//!
//! Plain data types exchanged between the content indexer crates: entity
//! kinds, denormalized source rows, search documents, change notifications
//! and extraction cursors.

pub mod cursor;
pub mod documents;
pub mod entity;
pub mod notification;
pub mod rows;
pub mod state_value;

pub use cursor::CursorState;
pub use documents::{GenreDocument, MovieDocument, NamedRef, PersonDocument, SearchDocument};
pub use entity::{EntityKind, Relation, TableKind};
pub use notification::{ChangeNotification, ChangeOperation, MalformedNotification};
pub use rows::{FilmWorkRow, GenreRef, GenreRow, PersonCredit, PersonRow, SourceRow};
pub use state_value::StateValue;
