//! Settings read from the environment.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use content_indexer_repository::postgres::validate_channel_name;
use content_indexer_repository::{PostgresConfig, RedisConfig};

use crate::IndexingError;

/// Default OpenSearch URL.
const DEFAULT_ELK_URL: &str = "http://localhost:9200";

/// Default key prefix of the cursor state.
const DEFAULT_STATE_NAMESPACE: &str = "etl_state:";

/// Default notification channel.
const DEFAULT_NOTIFY_CHANNEL: &str = "content_changes";

const DEFAULT_BATCH_SIZE: usize = 1000;

const DEFAULT_LISTEN_TIMEOUT_SECS: u64 = 5;

/// Where cursor state is kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateBackend {
    Redis,
    /// Process memory; every restart reloads all rows.
    Memory,
}

impl FromStr for StateBackend {
    type Err = IndexingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "redis" => Ok(StateBackend::Redis),
            "memory" => Ok(StateBackend::Memory),
            other => Err(IndexingError::config(format!(
                "STATE_BACKEND must be redis or memory, got {:?}",
                other
            ))),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl LogFormat {
    /// Read `LOG_FORMAT`; anything but `json` means text.
    ///
    /// Read on its own so logging is up before [`Settings`] are validated.
    pub fn from_env() -> Self {
        Self::parse(env::var("LOG_FORMAT").ok().as_deref())
    }

    fn parse(value: Option<&str>) -> Self {
        match value {
            Some(v) if v.eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Text,
        }
    }
}

/// Indexer settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub postgres: PostgresConfig,
    pub elk_url: String,
    pub state_backend: StateBackend,
    pub redis: RedisConfig,
    pub state_namespace: String,
    pub batch_size: usize,
    pub notify_channel: String,
    pub listen_timeout: Duration,
    /// Directory of `{index}_schema.json` overrides.
    pub schema_dir: Option<PathBuf>,
}

impl Settings {
    /// Read settings from the process environment.
    ///
    /// # Environment Variables
    ///
    /// - `DB_NAME`, `DB_USER`, `DB_PASSWORD`: required
    /// - `DB_HOST` (default: localhost), `DB_PORT` (default: 5432)
    /// - `ELK_URL`: OpenSearch URL (default: http://localhost:9200)
    /// - `STATE_BACKEND`: `redis` or `memory` (default: redis)
    /// - `REDIS_HOST` (default: localhost), `REDIS_PORT` (default: 6379)
    /// - `STATE_NAMESPACE` (default: etl_state:)
    /// - `BATCH_SIZE` (default: 1000)
    /// - `NOTIFY_CHANNEL` (default: content_changes)
    /// - `LISTEN_TIMEOUT_SECS` (default: 5)
    /// - `SCHEMA_DIR`: optional schema override directory
    ///
    /// # Returns
    ///
    /// * `Err(IndexingError::ConfigError)` - If a required variable is missing
    ///   or a value cannot be parsed
    pub fn from_env() -> Result<Self, IndexingError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Read settings through `lookup`; empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, IndexingError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let required =
            |key: &str| get(key).ok_or_else(|| IndexingError::config(format!("{} is not set", key)));

        let defaults = PostgresConfig::default();
        let postgres = PostgresConfig {
            host: get("DB_HOST").unwrap_or(defaults.host.clone()),
            port: parse_or(&get, "DB_PORT", defaults.port)?,
            database: required("DB_NAME")?,
            user: required("DB_USER")?,
            password: required("DB_PASSWORD")?,
            ..defaults
        };

        let redis_defaults = RedisConfig::default();
        let redis = RedisConfig {
            host: get("REDIS_HOST").unwrap_or(redis_defaults.host.clone()),
            port: parse_or(&get, "REDIS_PORT", redis_defaults.port)?,
            ..redis_defaults
        };

        let state_backend = match get("STATE_BACKEND") {
            Some(value) => value.parse()?,
            None => StateBackend::Redis,
        };

        let batch_size: usize = parse_or(&get, "BATCH_SIZE", DEFAULT_BATCH_SIZE)?;
        if batch_size == 0 {
            return Err(IndexingError::config("BATCH_SIZE must be greater than zero"));
        }

        let notify_channel =
            get("NOTIFY_CHANNEL").unwrap_or_else(|| DEFAULT_NOTIFY_CHANNEL.to_string());
        validate_channel_name(&notify_channel).map_err(|e| IndexingError::config(e.to_string()))?;

        let listen_timeout_secs: u64 =
            parse_or(&get, "LISTEN_TIMEOUT_SECS", DEFAULT_LISTEN_TIMEOUT_SECS)?;

        Ok(Self {
            postgres,
            elk_url: get("ELK_URL").unwrap_or_else(|| DEFAULT_ELK_URL.to_string()),
            state_backend,
            redis,
            state_namespace: get("STATE_NAMESPACE")
                .unwrap_or_else(|| DEFAULT_STATE_NAMESPACE.to_string()),
            batch_size,
            notify_channel,
            listen_timeout: Duration::from_secs(listen_timeout_secs.max(1)),
            schema_dir: get("SCHEMA_DIR").map(PathBuf::from),
        })
    }
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> Result<T, IndexingError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| IndexingError::config(format!("{} has invalid value {:?}: {}", key, raw, e))),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    const REQUIRED: [(&str, &str); 3] = [
        ("DB_NAME", "movies_database"),
        ("DB_USER", "app"),
        ("DB_PASSWORD", "123qwe"),
    ];

    #[test]
    fn test_defaults() {
        let settings = Settings::from_lookup(lookup(&REQUIRED)).unwrap();

        assert_eq!(settings.postgres.host, "localhost");
        assert_eq!(settings.postgres.port, 5432);
        assert_eq!(settings.redis.port, 6379);
        assert_eq!(settings.state_backend, StateBackend::Redis);
        assert_eq!(settings.state_namespace, "etl_state:");
        assert_eq!(settings.batch_size, 1000);
        assert_eq!(settings.notify_channel, "content_changes");
        assert_eq!(settings.listen_timeout, Duration::from_secs(5));
        assert!(settings.schema_dir.is_none());
    }

    #[test]
    fn test_overrides() {
        let mut vars = REQUIRED.to_vec();
        vars.extend([
            ("DB_PORT", "6432"),
            ("ELK_URL", "http://elastic:9200"),
            ("STATE_BACKEND", "Memory"),
            ("BATCH_SIZE", "250"),
            ("SCHEMA_DIR", "/etc/indexer/schemas"),
        ]);

        let settings = Settings::from_lookup(lookup(&vars)).unwrap();

        assert_eq!(settings.postgres.port, 6432);
        assert_eq!(settings.elk_url, "http://elastic:9200");
        assert_eq!(settings.state_backend, StateBackend::Memory);
        assert_eq!(settings.batch_size, 250);
        assert_eq!(settings.schema_dir, Some(PathBuf::from("/etc/indexer/schemas")));
    }

    #[test]
    fn test_log_format() {
        assert_eq!(LogFormat::parse(Some("JSON")), LogFormat::Json);
        assert_eq!(LogFormat::parse(Some("pretty")), LogFormat::Text);
        assert_eq!(LogFormat::parse(None), LogFormat::Text);
    }

    #[test]
    fn test_missing_required_value() {
        let err = Settings::from_lookup(lookup(&REQUIRED[..2])).unwrap_err();
        assert!(err.to_string().contains("DB_PASSWORD"));
    }

    #[test]
    fn test_invalid_values() {
        for (key, value) in [
            ("DB_PORT", "five"),
            ("BATCH_SIZE", "0"),
            ("STATE_BACKEND", "postgres"),
            ("NOTIFY_CHANNEL", "drop table;"),
        ] {
            let mut vars = REQUIRED.to_vec();
            vars.push((key, value));
            assert!(
                matches!(
                    Settings::from_lookup(lookup(&vars)),
                    Err(IndexingError::ConfigError(_))
                ),
                "{} = {} should be rejected",
                key,
                value
            );
        }
    }
}
