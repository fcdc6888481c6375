//! Narrow capabilities shared by several backends.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::errors::{ReadinessError, SearchError};
use crate::types::SchemaOutcome;

/// A dependency that can report whether it is ready to serve requests.
#[async_trait]
pub trait ReadinessProbe: Send + Sync {
    /// Short component name used in logs and errors.
    fn component(&self) -> &'static str;

    /// Single readiness check. Never errors; an unreachable backend is not ready.
    async fn is_ready(&self) -> bool;

    /// Poll [`is_ready`](Self::is_ready) until it succeeds.
    ///
    /// # Arguments
    ///
    /// * `poll_interval` - Delay between checks
    /// * `max_wait` - Give up after this long; `None` waits forever
    async fn wait_until_ready(
        &self,
        poll_interval: Duration,
        max_wait: Option<Duration>,
    ) -> Result<(), ReadinessError> {
        let started = Instant::now();
        loop {
            if self.is_ready().await {
                info!(component = self.component(), "Dependency is ready");
                return Ok(());
            }

            let waited = started.elapsed();
            if max_wait.is_some_and(|max| waited >= max) {
                return Err(ReadinessError {
                    component: self.component().to_string(),
                    waited,
                });
            }

            debug!(
                component = self.component(),
                waited_ms = waited.as_millis() as u64,
                "Dependency not ready yet"
            );
            tokio::time::sleep(poll_interval).await;
        }
    }
}

/// Creates indices from schema documents.
#[async_trait]
pub trait SchemaApplier: Send + Sync {
    /// Create `index` with the given settings and mappings.
    ///
    /// An index that already exists is reported as
    /// [`SchemaOutcome::AlreadyExists`], not as an error.
    async fn apply_schema(&self, index: &str, schema: &Value)
        -> Result<SchemaOutcome, SearchError>;
}
