pub mod config;
pub mod dataset;

pub use config::{
    AppConfig, ConfigError, LoggingConfig, ModelConfig, RetrievalConfig, ServerConfig,
    DEFAULT_CACHE_DIR, DEFAULT_CONFIG_FILE,
};
pub use dataset::{ExampleStore, IntentExamples};
