//! State store error types.

use thiserror::Error;

/// Errors raised by a state store backend.
#[derive(Error, Debug, Clone)]
pub enum StateError {
    /// The backend is unreachable.
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// The backend rejected a command.
    #[error("Command error: {0}")]
    CommandError(String),

    /// A stored value could not be decoded.
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl StateError {
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::ConnectionError(msg.into())
    }

    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::SerializationError(msg.into())
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, Self::ConnectionError(_))
    }
}

impl From<redis::RedisError> for StateError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_io_error()
            || err.is_connection_refusal()
            || err.is_connection_dropped()
            || err.is_timeout()
        {
            Self::ConnectionError(err.to_string())
        } else {
            Self::CommandError(err.to_string())
        }
    }
}

impl From<serde_json::Error> for StateError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}
