//! Dependency initialization and wiring for the content indexer.

use std::sync::Arc;
use std::time::Duration;

use content_indexer_pipeline::{
    ChangeListener, CursorStore, Extractor, ExtractorConfig, ListenerConfig, LoaderConfig,
    Pipeline, SearchLoader,
};
use content_indexer_repository::{
    IndexSchemas, InMemoryStateStore, OpenSearchClient, PgChangeChannel, PostgresSource,
    ReadinessProbe, RedisStateStore, StateStore,
};
use tracing::{info, warn};

use super::settings::{Settings, StateBackend};
use crate::IndexingError;

/// How long startup waits for the database before installing triggers.
const DATABASE_READY_TIMEOUT: Duration = Duration::from_secs(120);

/// Container for all initialized dependencies.
pub struct Dependencies {
    /// The configured pipeline ready to run.
    pub pipeline: Pipeline,
    source: Arc<PostgresSource>,
}

impl Dependencies {
    /// Build every client once and wire the pipeline.
    ///
    /// Nothing here talks to the network: the Postgres pool connects lazily
    /// and readiness is checked by the pipeline before catch-up.
    ///
    /// # Returns
    ///
    /// * `Ok(Dependencies)` - Initialized dependencies
    /// * `Err(IndexingError)` - If a client cannot be created or a schema
    ///   override is invalid
    pub async fn new(settings: &Settings) -> Result<Self, IndexingError> {
        info!(
            db_host = %settings.postgres.host,
            db_name = %settings.postgres.database,
            elk_url = %settings.elk_url,
            state_backend = ?settings.state_backend,
            batch_size = settings.batch_size,
            channel = %settings.notify_channel,
            "Initializing dependencies"
        );

        let source = Arc::new(PostgresSource::connect_lazy(&settings.postgres));

        let search_client = Arc::new(OpenSearchClient::new(&settings.elk_url).map_err(|e| {
            IndexingError::config(format!("Failed to create OpenSearch client: {}", e))
        })?);

        let schemas = match &settings.schema_dir {
            Some(dir) => IndexSchemas::from_dir(dir)
                .map_err(|e| IndexingError::config(format!("Invalid index schemas: {}", e)))?,
            None => IndexSchemas::builtin(),
        };

        let (state, state_probe): (Arc<dyn StateStore>, Arc<dyn ReadinessProbe>) =
            match settings.state_backend {
                StateBackend::Redis => {
                    let store = Arc::new(RedisStateStore::new(
                        &settings.redis.url(),
                        settings.state_namespace.clone(),
                    )?);
                    let probe: Arc<dyn ReadinessProbe> = store.clone();
                    let state: Arc<dyn StateStore> = store;
                    (state, probe)
                }
                StateBackend::Memory => {
                    warn!("Using in-memory state; every restart reloads all rows");
                    let store = Arc::new(InMemoryStateStore::new(settings.state_namespace.clone()));
                    let probe: Arc<dyn ReadinessProbe> = store.clone();
                    let state: Arc<dyn StateStore> = store;
                    (state, probe)
                }
            };

        let extractor = Arc::new(Extractor::with_config(
            source.clone(),
            ExtractorConfig {
                batch_size: settings.batch_size,
                ..Default::default()
            },
        ));

        let loader = Arc::new(SearchLoader::with_config(
            search_client.clone(),
            search_client.clone(),
            LoaderConfig {
                schemas,
                ..Default::default()
            },
        ));

        let listener = ChangeListener::with_config(
            Box::new(PgChangeChannel::new(source.pool().clone())),
            extractor.clone(),
            loader.clone(),
            ListenerConfig {
                channel: settings.notify_channel.clone(),
                poll_timeout: settings.listen_timeout,
                ..Default::default()
            },
        );

        let pipeline = Pipeline::new(extractor, loader, CursorStore::new(state), listener)
            .with_readiness_probe(source.clone())
            .with_readiness_probe(search_client)
            .with_readiness_probe(state_probe);

        Ok(Self { pipeline, source })
    }

    /// Wait for the database, then install the change triggers.
    pub async fn install_triggers(&self, channel: &str) -> Result<(), IndexingError> {
        self.source
            .wait_until_ready(Duration::from_secs(1), Some(DATABASE_READY_TIMEOUT))
            .await?;
        self.source.install_triggers(channel).await?;
        Ok(())
    }

    /// Release pooled connections.
    pub async fn shutdown(&self) {
        self.source.close().await;
        info!("Closed database pool");
    }
}
