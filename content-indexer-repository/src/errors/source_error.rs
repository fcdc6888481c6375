//! Source database error types.

use thiserror::Error;

/// Errors raised while reading from the relational source or its
/// notification channel.
#[derive(Error, Debug, Clone)]
pub enum SourceError {
    /// The connection dropped or could not be established.
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// The database rejected a statement.
    #[error("Query error: {0}")]
    QueryError(String),

    /// A row could not be decoded into its typed shape.
    #[error("Decode error: {0}")]
    DecodeError(String),

    /// Invalid caller input, such as a bad channel name.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl SourceError {
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::ConnectionError(msg.into())
    }

    pub fn query(msg: impl Into<String>) -> Self {
        Self::QueryError(msg.into())
    }

    pub fn decode(msg: impl Into<String>) -> Self {
        Self::DecodeError(msg.into())
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Whether reconnecting and retrying may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::ConnectionError(_))
    }
}

impl From<sqlx::Error> for SourceError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::Protocol(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => Self::ConnectionError(err.to_string()),
            // SQLSTATE class 08 (connection exception) and 57P (operator intervention)
            sqlx::Error::Database(db_err)
                if db_err
                    .code()
                    .is_some_and(|code| code.starts_with("08") || code.starts_with("57P")) =>
            {
                Self::ConnectionError(err.to_string())
            }
            sqlx::Error::ColumnDecode { .. }
            | sqlx::Error::ColumnNotFound(_)
            | sqlx::Error::ColumnIndexOutOfBounds { .. }
            | sqlx::Error::Decode(_)
            | sqlx::Error::TypeNotFound { .. } => Self::DecodeError(err.to_string()),
            _ => Self::QueryError(err.to_string()),
        }
    }
}
