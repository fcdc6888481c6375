//! Postgres LISTEN/NOTIFY change channel.

use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::{PgListener, PgPool};
use tracing::{debug, warn};

use crate::errors::SourceError;
use crate::interfaces::ChangeChannel;

/// Change channel backed by a dedicated `PgListener` connection.
pub struct PgChangeChannel {
    pool: PgPool,
    listener: Option<PgListener>,
}

impl PgChangeChannel {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            listener: None,
        }
    }
}

#[async_trait]
impl ChangeChannel for PgChangeChannel {
    async fn subscribe(&mut self, channel: &str) -> Result<(), SourceError> {
        self.close().await;

        let mut listener = PgListener::connect_with(&self.pool).await?;
        listener.listen(channel).await?;
        debug!(channel = %channel, "Subscribed to change channel");

        self.listener = Some(listener);
        Ok(())
    }

    async fn poll(&mut self, timeout: Duration) -> Result<Option<String>, SourceError> {
        let Some(listener) = self.listener.as_mut() else {
            return Err(SourceError::connection("Change channel is not subscribed"));
        };

        let received = tokio::time::timeout(timeout, listener.try_recv()).await;
        match received {
            Err(_) => Ok(None),
            Ok(Ok(Some(notification))) => Ok(Some(notification.payload().to_string())),
            Ok(Ok(None)) => {
                // The listener would silently reconnect and miss notifications
                // sent meanwhile; surface the loss instead.
                self.listener = None;
                Err(SourceError::connection("Notification connection closed"))
            }
            Ok(Err(e)) => {
                self.listener = None;
                Err(SourceError::from(e))
            }
        }
    }

    async fn close(&mut self) {
        if let Some(mut listener) = self.listener.take() {
            if let Err(e) = listener.unlisten_all().await {
                warn!(error = %e, "Failed to unlisten cleanly");
            }
        }
    }
}
