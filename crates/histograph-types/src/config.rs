//! Configuration loading for the Histograph ingestion daemon.
//!
//! Layered config: defaults -> config file -> env vars -> CLI flags.
//! The default config file lives at `~/.config/histograph/config.toml`
//! (platform dependent, resolved through `directories`).

use std::path::PathBuf;
use std::time::Duration;

use config::{Config, Environment, File};
use directories::ProjectDirs;
use secrecy::SecretString;
use serde::Deserialize;

use crate::error::HistographError;

/// Queue consumption settings.
#[derive(Debug, Clone, Deserialize)]
pub struct QueueSettings {
    /// Redis connection URL
    #[serde(default = "default_redis_url")]
    pub redis_url: String,

    /// Name of the list the producers push to
    #[serde(default = "default_queue_name")]
    pub name: String,

    /// Log a progress line every N parsed messages (0 disables)
    #[serde(default = "default_progress_every")]
    pub progress_every: u64,
}

fn default_redis_url() -> String {
    "redis://127.0.0.1:6379".to_string()
}

fn default_queue_name() -> String {
    "histograph".to_string()
}

fn default_progress_every() -> u64 {
    100
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            redis_url: default_redis_url(),
            name: default_queue_name(),
            progress_every: default_progress_every(),
        }
    }
}

/// Batching settings for the search projection.
#[derive(Debug, Clone, Deserialize)]
pub struct CoreSettings {
    /// Close a batch once it holds this many documents
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Close a batch this many milliseconds after its first document
    #[serde(default = "default_batch_timeout_ms")]
    pub batch_timeout_ms: u64,
}

fn default_batch_size() -> usize {
    500
}

fn default_batch_timeout_ms() -> u64 {
    5_000
}

impl Default for CoreSettings {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            batch_timeout_ms: default_batch_timeout_ms(),
        }
    }
}

impl CoreSettings {
    /// Batch window as a `Duration`.
    pub fn batch_timeout(&self) -> Duration {
        Duration::from_millis(self.batch_timeout_ms)
    }
}

/// Search engine settings.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchSettings {
    /// Base URL of the search engine
    #[serde(default = "default_search_url")]
    pub url: String,

    /// Timeout for a single bulk request
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Cooldown after a rejected or timed out bulk request
    #[serde(default = "default_retry_time_ms")]
    pub retry_time_ms: u64,

    /// Maximum concurrent index creations per batch
    #[serde(default = "default_create_concurrency")]
    pub create_concurrency: usize,

    /// Optional JSON file replacing the built-in index mapping
    #[serde(default)]
    pub mapping_path: Option<String>,
}

fn default_search_url() -> String {
    "http://127.0.0.1:9200".to_string()
}

fn default_request_timeout_ms() -> u64 {
    60_000
}

fn default_retry_time_ms() -> u64 {
    10_000
}

fn default_create_concurrency() -> usize {
    10
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            url: default_search_url(),
            request_timeout_ms: default_request_timeout_ms(),
            retry_time_ms: default_retry_time_ms(),
            create_concurrency: default_create_concurrency(),
            mapping_path: None,
        }
    }
}

impl SearchSettings {
    /// Bulk request timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Suspension cooldown.
    pub fn retry_time(&self) -> Duration {
        Duration::from_millis(self.retry_time_ms)
    }

    /// Load the index mapping file, if one is configured.
    pub fn load_mapping(&self) -> Result<Option<serde_json::Value>, HistographError> {
        let Some(path) = &self.mapping_path else {
            return Ok(None);
        };
        let raw = std::fs::read_to_string(path)?;
        Ok(Some(serde_json::from_str(&raw)?))
    }
}

/// Graph store settings.
#[derive(Debug, Clone, Deserialize)]
pub struct GraphSettings {
    /// Base URL of the graph store
    #[serde(default = "default_graph_url")]
    pub url: String,

    /// Optional user name
    #[serde(default)]
    pub user: Option<String>,

    /// Optional password (never logged)
    #[serde(default)]
    pub password: Option<SecretString>,

    /// Retries for transient registration failures
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Timeout for a single registration request
    #[serde(default = "default_graph_timeout_ms")]
    pub request_timeout_ms: u64,
}

fn default_graph_url() -> String {
    "http://127.0.0.1:7474".to_string()
}

fn default_max_retries() -> u32 {
    3
}

fn default_graph_timeout_ms() -> u64 {
    30_000
}

impl Default for GraphSettings {
    fn default() -> Self {
        Self {
            url: default_graph_url(),
            user: None,
            password: None,
            max_retries: default_max_retries(),
            request_timeout_ms: default_graph_timeout_ms(),
        }
    }
}

impl GraphSettings {
    /// Credential pair, when both halves are configured.
    pub fn credentials(&self) -> Option<(String, SecretString)> {
        match (&self.user, &self.password) {
            (Some(user), Some(password)) => Some((user.clone(), password.clone())),
            _ => None,
        }
    }

    /// Registration request timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// Main application settings
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    /// Queue source
    #[serde(default)]
    pub queue: QueueSettings,

    /// Batching
    #[serde(default)]
    pub core: CoreSettings,

    /// Search engine
    #[serde(default)]
    pub elasticsearch: SearchSettings,

    /// Graph store
    #[serde(default)]
    pub graph: GraphSettings,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn config_err(e: config::ConfigError) -> HistographError {
    HistographError::Config(e.to_string())
}

impl Settings {
    /// Load settings with layered precedence:
    /// 1. Built-in defaults
    /// 2. Config file (~/.config/histograph/config.toml)
    /// 3. CLI-specified config file (optional)
    /// 4. Environment variables (HISTOGRAPH__SECTION__KEY)
    ///
    /// CLI flags should be applied by the caller after this returns.
    pub fn load(cli_config_path: Option<&str>) -> Result<Self, HistographError> {
        let config_dir = ProjectDirs::from("", "", "histograph")
            .map(|p| p.config_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));

        let default_config_path = config_dir.join("config");

        let mut builder = Config::builder()
            .set_default("log_level", default_log_level())
            .map_err(config_err)?
            .set_default("queue.name", default_queue_name())
            .map_err(config_err)?
            .set_default("core.batch_size", default_batch_size() as i64)
            .map_err(config_err)?
            .set_default("core.batch_timeout_ms", default_batch_timeout_ms() as i64)
            .map_err(config_err)?
            .add_source(File::with_name(&default_config_path.to_string_lossy()).required(false));

        if let Some(path) = cli_config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // HISTOGRAPH__CORE__BATCH_SIZE, HISTOGRAPH__GRAPH__PASSWORD, ...
        builder = builder.add_source(
            Environment::with_prefix("HISTOGRAPH")
                .separator("__")
                .try_parsing(true),
        );

        let settings: Settings = builder
            .build()
            .map_err(config_err)?
            .try_deserialize()
            .map_err(config_err)?;

        settings.validate()?;
        Ok(settings)
    }

    /// Reject settings the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), HistographError> {
        if self.core.batch_size == 0 {
            return Err(HistographError::Config(
                "core.batch_size must be > 0".to_string(),
            ));
        }
        if self.core.batch_timeout_ms == 0 {
            return Err(HistographError::Config(
                "core.batch_timeout_ms must be > 0".to_string(),
            ));
        }
        if self.elasticsearch.create_concurrency == 0 {
            return Err(HistographError::Config(
                "elasticsearch.create_concurrency must be > 0".to_string(),
            ));
        }
        if self.graph.user.is_some() != self.graph.password.is_some() {
            return Err(HistographError::Config(
                "graph.user and graph.password must be set together".to_string(),
            ));
        }
        Ok(())
    }
}
