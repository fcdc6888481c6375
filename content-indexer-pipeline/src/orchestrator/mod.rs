//! Orchestrator module for the content indexer pipeline.
//!
//! Runs catch-up for every entity kind, then hands over to the listener.

use std::sync::Arc;
use std::time::Duration;

use content_indexer_repository::ReadinessProbe;
use content_indexer_shared::EntityKind;
use tokio::sync::broadcast::{self, error::TryRecvError};
use tracing::{error, info, instrument, warn};

use crate::errors::PipelineError;
use crate::extractor::Extractor;
use crate::listener::ChangeListener;
use crate::loader::{warn_partial_failure, SearchLoader};
use crate::state::CursorStore;
use crate::transformer::Transformer;

/// Configuration for the pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Delay between readiness checks of a dependency.
    pub readiness_poll_interval: Duration,
    /// Give up waiting for a dependency after this long; `None` waits forever.
    pub readiness_timeout: Option<Duration>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            readiness_poll_interval: Duration::from_secs(1),
            readiness_timeout: Some(Duration::from_secs(120)),
        }
    }
}

/// Catch-up result of one entity kind.
#[derive(Debug, Clone, PartialEq)]
pub struct KindReport {
    pub kind: EntityKind,
    /// Non-empty batches loaded.
    pub batches: usize,
    pub loaded: usize,
    pub failed_ids: Vec<String>,
    /// Set when the kind stopped on an error.
    pub error: Option<String>,
}

impl KindReport {
    fn new(kind: EntityKind) -> Self {
        Self {
            kind,
            batches: 0,
            loaded: 0,
            failed_ids: Vec::new(),
            error: None,
        }
    }
}

/// Catch-up result of all kinds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatchUpReport {
    pub kinds: Vec<KindReport>,
    /// Shutdown arrived before every kind was caught up.
    pub cancelled: bool,
}

impl CatchUpReport {
    pub fn kind(&self, kind: EntityKind) -> Option<&KindReport> {
        self.kinds.iter().find(|report| report.kind == kind)
    }

    pub fn total_loaded(&self) -> usize {
        self.kinds.iter().map(|report| report.loaded).sum()
    }

    pub fn has_errors(&self) -> bool {
        self.kinds.iter().any(|report| report.error.is_some())
    }
}

/// Pipeline that keeps the search indices in sync with the content database.
///
/// The pipeline:
/// - Waits for its dependencies and creates missing indices
/// - Subscribes the listener so no change is missed during catch-up
/// - Catches up every entity kind from its saved cursor
/// - Applies change notifications until shutdown
pub struct Pipeline {
    extractor: Arc<Extractor>,
    transformer: Transformer,
    loader: Arc<SearchLoader>,
    cursors: CursorStore,
    listener: ChangeListener,
    probes: Vec<Arc<dyn ReadinessProbe>>,
    config: PipelineConfig,
    shutdown_tx: broadcast::Sender<()>,
}

impl Pipeline {
    /// Create a new pipeline from its components.
    ///
    /// `extractor` and `loader` are shared with `listener`.
    pub fn new(
        extractor: Arc<Extractor>,
        loader: Arc<SearchLoader>,
        cursors: CursorStore,
        listener: ChangeListener,
    ) -> Self {
        Self::with_config(extractor, loader, cursors, listener, PipelineConfig::default())
    }

    /// Create a new pipeline with custom configuration.
    pub fn with_config(
        extractor: Arc<Extractor>,
        loader: Arc<SearchLoader>,
        cursors: CursorStore,
        listener: ChangeListener,
        config: PipelineConfig,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            extractor,
            transformer: Transformer::new(),
            loader,
            cursors,
            listener,
            probes: Vec::new(),
            config,
            shutdown_tx,
        }
    }

    /// Wait for `probe` to be ready before catch-up.
    pub fn with_readiness_probe(mut self, probe: Arc<dyn ReadinessProbe>) -> Self {
        self.probes.push(probe);
        self
    }

    /// Sender that stops the pipeline when a message is sent on it.
    pub fn shutdown_handle(&self) -> broadcast::Sender<()> {
        self.shutdown_tx.clone()
    }

    /// Trigger a graceful shutdown.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    pub fn listener(&self) -> &ChangeListener {
        &self.listener
    }

    /// Wait for every dependency, then create missing indices.
    #[instrument(skip(self))]
    pub async fn prepare(&self) -> Result<(), PipelineError> {
        for probe in &self.probes {
            probe
                .wait_until_ready(
                    self.config.readiness_poll_interval,
                    self.config.readiness_timeout,
                )
                .await?;
        }
        self.loader.ensure_indices().await
    }

    /// Load every row changed since the saved cursors.
    ///
    /// Kinds are caught up one after another. A kind that fails is logged and
    /// reported; the remaining kinds still run. A shutdown signal stops the
    /// catch-up between batches.
    #[instrument(skip(self, shutdown))]
    pub async fn catch_up(&self, shutdown: &mut broadcast::Receiver<()>) -> CatchUpReport {
        let mut report = CatchUpReport::default();

        for kind in EntityKind::ALL {
            let mut kind_report = KindReport::new(kind);
            match self.catch_up_kind(kind, &mut kind_report, shutdown).await {
                Ok(()) => info!(
                    kind = %kind,
                    batches = kind_report.batches,
                    loaded = kind_report.loaded,
                    failed = kind_report.failed_ids.len(),
                    "Caught up"
                ),
                Err(PipelineError::Cancelled) => {
                    info!(kind = %kind, "Catch-up interrupted by shutdown");
                    report.kinds.push(kind_report);
                    report.cancelled = true;
                    return report;
                }
                Err(e) => {
                    error!(kind = %kind, error = %e, "Catch-up failed");
                    kind_report.error = Some(e.to_string());
                }
            }
            report.kinds.push(kind_report);
        }

        report
    }

    async fn catch_up_kind(
        &self,
        kind: EntityKind,
        report: &mut KindReport,
        shutdown: &mut broadcast::Receiver<()>,
    ) -> Result<(), PipelineError> {
        let mut cursor = self.cursors.load(kind).await?;
        let index = kind.index_name();

        loop {
            let mut reader = self.extractor.fetch_from(kind, &cursor);
            let mut read_any = false;

            loop {
                if shutdown_requested(shutdown) {
                    return Err(PipelineError::Cancelled);
                }

                let rows = reader.next_batch().await?;
                if rows.is_empty() {
                    break;
                }
                read_any = true;

                let documents = self.transformer.transform_batch(&rows);
                let load = self.loader.load_bulk(index, &documents).await?;
                warn_partial_failure(kind, &load);

                report.batches += 1;
                report.loaded += load.loaded;
                report.failed_ids.extend(load.failed_ids);

                if cursor.advance(&rows) {
                    self.cursors.save(kind, &cursor).await?;
                }
            }

            if !read_any {
                return Ok(());
            }
        }
    }

    /// Run the pipeline until Ctrl-C or [`shutdown`](Self::shutdown).
    #[instrument(skip(self))]
    pub async fn run(&mut self) -> Result<(), PipelineError> {
        info!("Starting content indexer pipeline");

        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let signal_tx = self.shutdown_tx.clone();
        let signal_handle = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Received shutdown signal");
                let _ = signal_tx.send(());
            }
        });

        let result = self.run_until_shutdown(&mut shutdown_rx).await;
        signal_handle.abort();

        match &result {
            Ok(()) => info!("Pipeline shutdown complete"),
            Err(e) => error!(error = %e, "Pipeline stopped with an error"),
        }
        result
    }

    async fn run_until_shutdown(
        &mut self,
        shutdown: &mut broadcast::Receiver<()>,
    ) -> Result<(), PipelineError> {
        self.prepare().await?;

        match self.listener.connect(shutdown).await {
            Ok(()) => {}
            Err(PipelineError::Cancelled) => return Ok(()),
            Err(e) => return Err(e),
        }

        let report = self.catch_up(shutdown).await;
        if report.cancelled {
            self.listener.close().await;
            return Ok(());
        }
        if report.has_errors() {
            warn!("Some entity kinds failed to catch up; listening for changes anyway");
        }

        self.listener.run(shutdown).await
    }
}

fn shutdown_requested(shutdown: &mut broadcast::Receiver<()>) -> bool {
    !matches!(shutdown.try_recv(), Err(TryRecvError::Empty))
}
