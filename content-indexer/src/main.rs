use content_indexer::{Dependencies, IndexingError, LogFormat, Settings};
use dotenv::dotenv;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), IndexingError> {
    dotenv().ok();
    init_tracing(LogFormat::from_env());

    let settings = Settings::from_env().inspect_err(|e| error!(error = %e, "Invalid configuration"))?;

    let mut dependencies = Dependencies::new(&settings).await?;
    dependencies.install_triggers(&settings.notify_channel).await?;

    info!("Content indexer started");
    let result = dependencies.pipeline.run().await;
    dependencies.shutdown().await;

    result.map_err(IndexingError::from)
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}
