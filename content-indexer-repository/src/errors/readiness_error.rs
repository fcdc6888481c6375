use std::time::Duration;

use thiserror::Error;

/// A dependency did not become ready in time.
#[derive(Error, Debug, Clone)]
#[error("{component} not ready after {waited:?}")]
pub struct ReadinessError {
    pub component: String,
    pub waited: Duration,
}
