//! Change notification channel trait definition.

use std::time::Duration;

use async_trait::async_trait;

use crate::errors::SourceError;

/// A subscription to database change notifications.
///
/// Implementations own a dedicated connection; after a connection error the
/// caller re-subscribes.
#[async_trait]
pub trait ChangeChannel: Send {
    /// Open a connection and subscribe to `channel`.
    async fn subscribe(&mut self, channel: &str) -> Result<(), SourceError>;

    /// Wait up to `timeout` for the next payload.
    ///
    /// # Returns
    ///
    /// * `Ok(Some(payload))` - A notification arrived
    /// * `Ok(None)` - The timeout elapsed with no notification
    /// * `Err(SourceError::ConnectionError)` - The connection was lost
    async fn poll(&mut self, timeout: Duration) -> Result<Option<String>, SourceError>;

    /// Unsubscribe and drop the connection. Safe to call more than once.
    async fn close(&mut self);
}
