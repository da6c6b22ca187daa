//! Configuration loading for the knowledge store.
//!
//! Layered config: defaults -> config file -> env vars -> CLI flags.
//! The default config file lives at ~/.config/knowledge-store/config.toml.

use config::{Config, Environment, File};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::KnowledgeError;
use crate::{DEFAULT_TOP_K, MAX_SEGMENT_LENGTH, VECTOR_DIMENSION};

/// How a batch ingest treats records already persisted on disk.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IngestMode {
    /// Start from the persisted store and upsert each new record (default)
    #[default]
    Merge,
    /// Persist only the records of the current batch
    Replace,
}

impl IngestMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            IngestMode::Merge => "merge",
            IngestMode::Replace => "replace",
        }
    }
}

/// Embedding provider settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSettings {
    /// API base URL; `/embeddings` is appended
    #[serde(default = "default_provider_base_url")]
    pub base_url: String,

    /// Embedding model name
    #[serde(default = "default_provider_model")]
    pub model: String,

    /// API key (loaded from env var, not stored in config file)
    #[serde(default)]
    pub api_key: Option<String>,

    /// Vector dimension every response must match
    #[serde(default = "default_dimension")]
    pub dimension: usize,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_provider_base_url() -> String {
    "https://open.bigmodel.cn/api/paas/v4".to_string()
}

fn default_provider_model() -> String {
    "embedding-2".to_string()
}

fn default_dimension() -> usize {
    VECTOR_DIMENSION
}

fn default_timeout_secs() -> u64 {
    60
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            base_url: default_provider_base_url(),
            model: default_provider_model(),
            api_key: None,
            dimension: default_dimension(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Path to the persisted embedding file
    #[serde(default = "default_store_path")]
    pub store_path: String,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Maximum characters per segment sent to the provider
    #[serde(default = "default_max_segment_length")]
    pub max_segment_length: usize,

    /// Maximum in-flight provider requests per document
    #[serde(default = "default_segment_concurrency")]
    pub segment_concurrency: usize,

    /// Number of matches returned when the caller does not pass k
    #[serde(default = "default_top_k")]
    pub default_top_k: usize,

    /// Batch ingest behaviour towards the persisted store
    #[serde(default)]
    pub ingest_mode: IngestMode,

    /// Embedding provider configuration
    #[serde(default)]
    pub provider: ProviderSettings,
}

fn default_store_path() -> String {
    ProjectDirs::from("", "", "knowledge-store")
        .map(|p| p.data_local_dir().join("embeddings.txt"))
        .unwrap_or_else(|| PathBuf::from("./embeddings.txt"))
        .to_string_lossy()
        .to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_segment_length() -> usize {
    MAX_SEGMENT_LENGTH
}

fn default_segment_concurrency() -> usize {
    4
}

fn default_top_k() -> usize {
    DEFAULT_TOP_K
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            store_path: default_store_path(),
            log_level: default_log_level(),
            max_segment_length: default_max_segment_length(),
            segment_concurrency: default_segment_concurrency(),
            default_top_k: default_top_k(),
            ingest_mode: IngestMode::default(),
            provider: ProviderSettings::default(),
        }
    }
}

impl Settings {
    /// Load settings with layered precedence:
    /// 1. Built-in defaults
    /// 2. Config file (~/.config/knowledge-store/config.toml)
    /// 3. CLI-specified config file (optional)
    /// 4. Environment variables (KNOWLEDGE_*)
    ///
    /// CLI flags should be applied by the caller after this returns.
    pub fn load(cli_config_path: Option<&str>) -> Result<Self, KnowledgeError> {
        let config_dir = ProjectDirs::from("", "", "knowledge-store")
            .map(|p| p.config_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));

        let default_config_path = config_dir.join("config");

        let mut builder = Config::builder()
            .set_default("store_path", default_store_path())?
            .set_default("log_level", default_log_level())?
            .set_default("max_segment_length", default_max_segment_length() as i64)?
            .set_default("segment_concurrency", default_segment_concurrency() as i64)?
            .set_default("default_top_k", default_top_k() as i64)?
            .set_default("ingest_mode", IngestMode::default().as_str())?
            .set_default("provider.base_url", default_provider_base_url())?
            .set_default("provider.model", default_provider_model())?
            .set_default("provider.dimension", default_dimension() as i64)?
            .set_default("provider.timeout_secs", default_timeout_secs() as i64)?
            .add_source(File::with_name(&default_config_path.to_string_lossy()).required(false));

        if let Some(path) = cli_config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // KNOWLEDGE_STORE_PATH, KNOWLEDGE_PROVIDER__API_KEY, ...
        builder = builder.add_source(
            Environment::with_prefix("KNOWLEDGE")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), KnowledgeError> {
        if self.max_segment_length == 0 {
            return Err(KnowledgeError::Config(
                "max_segment_length must be > 0".to_string(),
            ));
        }
        if self.segment_concurrency == 0 {
            return Err(KnowledgeError::Config(
                "segment_concurrency must be > 0".to_string(),
            ));
        }
        if self.provider.dimension == 0 {
            return Err(KnowledgeError::Config(
                "provider.dimension must be > 0".to_string(),
            ));
        }
        if self.store_path.trim().is_empty() {
            return Err(KnowledgeError::Config("store_path is empty".to_string()));
        }
        Ok(())
    }

    /// Expand ~ in store_path to the home directory
    pub fn expanded_store_path(&self) -> PathBuf {
        if let Some(rest) = self.store_path.strip_prefix("~/") {
            if let Some(home) = directories::BaseDirs::new().map(|d| d.home_dir().to_path_buf()) {
                return home.join(rest);
            }
        }
        PathBuf::from(&self.store_path)
    }
}
