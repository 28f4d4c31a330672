//! Application configuration
//!
//! Settings are read from a TOML file (`intent-refine.toml` by default) and
//! then overridden by `INTENT_REFINE_*` environment variables.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default configuration file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "intent-refine.toml";

/// Default index cache directory, relative to the working directory
pub const DEFAULT_CACHE_DIR: &str = ".intent-refine";

const ENV_HOST: &str = "INTENT_REFINE_HOST";
const ENV_PORT: &str = "INTENT_REFINE_PORT";
const ENV_PROVIDER: &str = "INTENT_REFINE_PROVIDER";
const ENV_MODEL: &str = "INTENT_REFINE_MODEL";
const ENV_CACHE_DIR: &str = "INTENT_REFINE_CACHE_DIR";
const ENV_DATASET: &str = "INTENT_REFINE_DATASET";

/// Errors raised while loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("invalid example store: {0}")]
    Dataset(String),
}

/// Top-level application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub model: ModelConfig,
    pub retrieval: RetrievalConfig,
    pub logging: LoggingConfig,
}

/// HTTP listener settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub enable_cors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            enable_cors: true,
        }
    }
}

/// Language model provider settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ModelConfig {
    /// Provider name: `groq`, `openai` or `mock`
    pub provider: String,
    /// Model identifier; each provider has its own default
    pub model_name: Option<String>,
    /// Override for the provider's API base URL
    pub base_url: Option<String>,
    /// Where to read the API key: `env:VAR` or `file:/path`
    pub api_key_source: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
    /// Replaces the built-in system prompt template
    pub prompt_template_path: Option<PathBuf>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: "groq".to_string(),
            model_name: None,
            base_url: None,
            api_key_source: None,
            temperature: 0.0,
            max_tokens: 150,
            timeout_secs: 10,
            prompt_template_path: None,
        }
    }
}

/// Candidate retrieval settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Vocabulary cap
    pub max_features: usize,
    /// Minimum number of examples a term must occur in
    pub min_df: usize,
    /// Maximum fraction of examples a term may occur in
    pub max_df: f64,
    /// Rows considered per query
    pub top_k: usize,
    /// Directory holding persisted indexes
    pub cache_dir: PathBuf,
    /// Example store file; the built-in dataset is used when unset
    pub dataset_path: Option<PathBuf>,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            max_features: 500,
            min_df: 1,
            max_df: 0.95,
            top_k: 3,
            cache_dir: PathBuf::from(DEFAULT_CACHE_DIR),
            dataset_path: None,
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default `EnvFilter` directive when `RUST_LOG` is unset
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// File [`load_from`](Self::load_from) reads: the explicit path, else
    /// `intent-refine.toml` when it exists in the working directory
    pub fn source_path(path: Option<&Path>) -> Option<PathBuf> {
        match path {
            Some(path) => Some(path.to_path_buf()),
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                default_path.exists().then(|| default_path.to_path_buf())
            }
        }
    }

    /// Load from an explicit path, or the default file when `None`.
    ///
    /// An explicit path must exist; the default file is optional.
    /// Environment overrides are applied and the result is validated.
    pub fn load_from(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match Self::source_path(path) {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };

        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML file without applying overrides
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply `INTENT_REFINE_*` environment overrides
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(host) = env_value(ENV_HOST) {
            self.server.host = host;
        }
        if let Some(port) = env_value(ENV_PORT) {
            self.server.port = port
                .parse()
                .map_err(|_| ConfigError::Invalid(format!("{ENV_PORT}={port} is not a port")))?;
        }
        if let Some(provider) = env_value(ENV_PROVIDER) {
            self.model.provider = provider;
        }
        if let Some(model) = env_value(ENV_MODEL) {
            self.model.model_name = Some(model);
        }
        if let Some(dir) = env_value(ENV_CACHE_DIR) {
            self.retrieval.cache_dir = PathBuf::from(dir);
        }
        if let Some(dataset) = env_value(ENV_DATASET) {
            self.retrieval.dataset_path = Some(PathBuf::from(dataset));
        }
        Ok(())
    }

    /// Reject settings the service cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Invalid("server.port must be non-zero".into()));
        }
        let retrieval = &self.retrieval;
        if !(retrieval.max_df > 0.0 && retrieval.max_df <= 1.0) {
            return Err(ConfigError::Invalid(format!(
                "retrieval.max_df must be in (0, 1], got {}",
                retrieval.max_df
            )));
        }
        if retrieval.max_features == 0 {
            return Err(ConfigError::Invalid(
                "retrieval.max_features must be at least 1".into(),
            ));
        }
        if retrieval.min_df == 0 {
            return Err(ConfigError::Invalid("retrieval.min_df must be at least 1".into()));
        }
        if retrieval.top_k == 0 {
            return Err(ConfigError::Invalid("retrieval.top_k must be at least 1".into()));
        }
        Ok(())
    }

}

fn env_value(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
