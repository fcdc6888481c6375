//! Change listener for the content indexer pipeline.
//!
//! Applies database change notifications to the search indices one by one.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use content_indexer_repository::ChangeChannel;
use content_indexer_shared::{
    ChangeNotification, ChangeOperation, EntityKind, Relation, TableKind,
};
use tokio::sync::broadcast;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::errors::PipelineError;
use crate::extractor::Extractor;
use crate::loader::{RefreshOutcome, SearchLoader};
use crate::retry::RetryPolicy;
use crate::transformer::Transformer;

/// Configuration for the change listener.
#[derive(Debug, Clone)]
pub struct ListenerConfig {
    /// Notification channel name.
    pub channel: String,
    /// How long a single poll waits before looping.
    pub poll_timeout: Duration,
    /// Backoff used to (re)subscribe.
    pub reconnect: RetryPolicy,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            channel: "content_changes".to_string(),
            poll_timeout: Duration::from_secs(5),
            reconnect: RetryPolicy::unbounded(),
        }
    }
}

/// Connection state of the listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerState {
    Disconnected,
    Listening,
    /// The connection was lost and must be re-established.
    Faulted,
}

/// Documents touched while handling one notification.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChangeOutcome {
    pub indexed: usize,
    pub refreshed: usize,
    pub deleted: usize,
}

impl ChangeOutcome {
    pub fn is_noop(&self) -> bool {
        self.indexed == 0 && self.refreshed == 0 && self.deleted == 0
    }

    fn merge(&mut self, other: ChangeOutcome) {
        self.indexed += other.indexed;
        self.refreshed += other.refreshed;
        self.deleted += other.deleted;
    }
}

/// Listener that keeps the indices in sync with single-row changes.
pub struct ChangeListener {
    channel: Box<dyn ChangeChannel>,
    extractor: Arc<Extractor>,
    transformer: Transformer,
    loader: Arc<SearchLoader>,
    config: ListenerConfig,
    state: ListenerState,
}

impl ChangeListener {
    /// Create a new listener reading from `channel`.
    pub fn new(
        channel: Box<dyn ChangeChannel>,
        extractor: Arc<Extractor>,
        loader: Arc<SearchLoader>,
    ) -> Self {
        Self::with_config(channel, extractor, loader, ListenerConfig::default())
    }

    /// Create a new listener with custom configuration.
    pub fn with_config(
        channel: Box<dyn ChangeChannel>,
        extractor: Arc<Extractor>,
        loader: Arc<SearchLoader>,
        config: ListenerConfig,
    ) -> Self {
        Self {
            channel,
            extractor,
            transformer: Transformer::new(),
            loader,
            config,
            state: ListenerState::Disconnected,
        }
    }

    pub fn state(&self) -> ListenerState {
        self.state
    }

    /// Subscribe to the notification channel, retrying with backoff.
    ///
    /// The first subscribe fails fast on a non-transient error. Once the
    /// listener has been faulted every error is retried until it reconnects
    /// or shutdown arrives.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - The listener is subscribed
    /// * `Err(PipelineError::Cancelled)` - Shutdown arrived while waiting to retry
    /// * `Err(_)` - A non-transient error, or the reconnect policy gave up,
    ///   on the first subscribe only
    pub async fn connect(
        &mut self,
        shutdown: &mut broadcast::Receiver<()>,
    ) -> Result<(), PipelineError> {
        let reconnecting = self.state == ListenerState::Faulted;
        let mut attempt: u32 = 0;
        loop {
            let err = match self.channel.subscribe(&self.config.channel).await {
                Ok(()) => {
                    if reconnecting {
                        warn!(
                            channel = %self.config.channel,
                            "Reconnected; changes made while disconnected were not delivered"
                        );
                    }
                    info!(channel = %self.config.channel, "Listening for changes");
                    self.state = ListenerState::Listening;
                    return Ok(());
                }
                Err(e) => PipelineError::from(e),
            };

            let gave_up = self
                .config
                .reconnect
                .max_retries
                .is_some_and(|max| attempt >= max);
            if !reconnecting && (!err.is_transient() || gave_up) {
                error!(error = %err, attempt, "Could not subscribe to change notifications");
                return Err(err);
            }

            let delay = self.config.reconnect.delay_for(attempt);
            warn!(
                error = %err,
                attempt = attempt + 1,
                delay_ms = delay.as_millis() as u64,
                "Subscribe failed, retrying"
            );
            tokio::select! {
                _ = shutdown.recv() => return Err(PipelineError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
            attempt = attempt.saturating_add(1);
        }
    }

    /// Handle notifications until shutdown.
    ///
    /// A lost connection moves the listener to [`ListenerState::Faulted`] and
    /// it reconnects on the next iteration. Malformed payloads and failures
    /// to apply a change are logged and skipped.
    #[instrument(skip(self, shutdown), fields(channel = %self.config.channel))]
    pub async fn run(
        &mut self,
        shutdown: &mut broadcast::Receiver<()>,
    ) -> Result<(), PipelineError> {
        loop {
            if self.state != ListenerState::Listening {
                match self.connect(shutdown).await {
                    Ok(()) => {}
                    Err(PipelineError::Cancelled) => break,
                    Err(e) => return Err(e),
                }
            }

            let polled = tokio::select! {
                _ = shutdown.recv() => {
                    info!("Received shutdown signal");
                    break;
                }
                polled = self.channel.poll(self.config.poll_timeout) => polled,
            };

            match polled {
                Ok(Some(payload)) => self.dispatch(&payload).await,
                Ok(None) => continue,
                Err(e) => {
                    warn!(error = %e, "Lost connection to change channel");
                    self.state = ListenerState::Faulted;
                }
            }
        }

        self.close().await;
        info!("Change listener stopped");
        Ok(())
    }

    /// Unsubscribe and drop the channel connection.
    pub async fn close(&mut self) {
        self.channel.close().await;
        self.state = ListenerState::Disconnected;
    }

    async fn dispatch(&self, payload: &str) {
        let change = match decode(payload) {
            Ok(change) => change,
            Err(e) => {
                warn!(error = %e, "Skipping malformed notification");
                return;
            }
        };

        match self.handle_change(&change).await {
            Ok(outcome) if outcome.is_noop() => {
                debug!(table = %change.table, id = %change.id, "Change had no effect on the indices");
            }
            Ok(outcome) => {
                debug!(
                    table = %change.table,
                    id = %change.id,
                    indexed = outcome.indexed,
                    refreshed = outcome.refreshed,
                    deleted = outcome.deleted,
                    "Applied change"
                );
            }
            Err(e) => {
                error!(
                    table = %change.table,
                    operation = %change.operation,
                    id = %change.id,
                    error = %e,
                    "Failed to apply change"
                );
            }
        }
    }

    /// Apply one change to the indices.
    ///
    /// A root row is re-read and indexed, or deleted. A related row updates
    /// its own document and refreshes every film linked to it; a link row
    /// refreshes its film. Untracked tables are ignored.
    #[instrument(skip(self, change), fields(table = %change.table, operation = %change.operation, id = %change.id))]
    pub async fn handle_change(
        &self,
        change: &ChangeNotification,
    ) -> Result<ChangeOutcome, PipelineError> {
        let deleted = change.operation == ChangeOperation::Delete;

        match change.table_kind() {
            Some(TableKind::Root) => self.sync_document(EntityKind::Movies, change.id, deleted).await,
            Some(TableKind::Linked(relation)) => self.sync_linked(relation, change, deleted).await,
            None => {
                debug!("Ignoring untracked table");
                Ok(ChangeOutcome::default())
            }
        }
    }

    async fn sync_linked(
        &self,
        relation: Relation,
        change: &ChangeNotification,
        deleted: bool,
    ) -> Result<ChangeOutcome, PipelineError> {
        let mut outcome = ChangeOutcome::default();

        if let Some(kind) = relation.own_kind() {
            outcome.merge(self.sync_document(kind, change.id, deleted).await?);
        }

        let mut film_ids: BTreeSet<Uuid> = match change.film_work_id {
            Some(film_id) => BTreeSet::from([film_id]),
            None => self
                .extractor
                .linked_film_ids(relation, change.id)
                .await?
                .into_iter()
                .collect(),
        };
        // a link row moved to another film leaves the previous one stale
        film_ids.extend(change.old_film_work_id);

        for film_id in film_ids {
            outcome.merge(self.refresh_film(film_id).await?);
        }
        Ok(outcome)
    }

    /// Re-read a row and index it; delete its document when the row is gone.
    async fn sync_document(
        &self,
        kind: EntityKind,
        id: Uuid,
        deleted: bool,
    ) -> Result<ChangeOutcome, PipelineError> {
        let row = if deleted {
            None
        } else {
            self.extractor.fetch_one(kind, id).await?
        };

        match row {
            Some(row) => {
                self.loader.index(&self.transformer.transform(&row)).await?;
                Ok(ChangeOutcome {
                    indexed: 1,
                    ..Default::default()
                })
            }
            None => {
                self.loader.delete(kind.index_name(), &id.to_string()).await?;
                Ok(ChangeOutcome {
                    deleted: 1,
                    ..Default::default()
                })
            }
        }
    }

    async fn refresh_film(&self, film_id: Uuid) -> Result<ChangeOutcome, PipelineError> {
        let Some(row) = self.extractor.fetch_one(EntityKind::Movies, film_id).await? else {
            self.loader
                .delete(EntityKind::Movies.index_name(), &film_id.to_string())
                .await?;
            return Ok(ChangeOutcome {
                deleted: 1,
                ..Default::default()
            });
        };

        let outcome = match self.loader.refresh(&self.transformer.transform(&row)).await? {
            RefreshOutcome::Updated => ChangeOutcome {
                refreshed: 1,
                ..Default::default()
            },
            RefreshOutcome::Indexed => ChangeOutcome {
                indexed: 1,
                ..Default::default()
            },
        };
        Ok(outcome)
    }
}

fn decode(payload: &str) -> Result<ChangeNotification, PipelineError> {
    Ok(ChangeNotification::parse(payload)?)
}
