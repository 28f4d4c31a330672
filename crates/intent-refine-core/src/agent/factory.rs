//! Provider Factory
//!
//! Creates model provider instances based on configuration.

use crate::agent::model::{ModelProvider, ProviderKind};
use crate::agent::providers::{MockProvider, OpenAiCompatProvider};
use crate::config::ModelConfig;
use anyhow::{anyhow, bail, Context, Result};
use std::sync::Arc;
use std::time::Duration;

pub const GROQ_API_KEY_ENV: &str = "GROQ_API_KEY";
pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Create a model provider from configuration.
///
/// Remote providers resolve their API key here, so a missing key fails at
/// startup rather than on the first request.
pub fn create_provider(config: &ModelConfig) -> Result<Arc<dyn ModelProvider>> {
    let provider_kind = ProviderKind::from_str(&config.provider)
        .ok_or_else(|| anyhow!("Unknown provider: {}", config.provider))?;

    let timeout = Duration::from_secs(config.timeout_secs);

    let provider: Arc<dyn ModelProvider> = match provider_kind {
        ProviderKind::Mock => {
            let provider = if let Some(ref model_name) = config.model_name {
                MockProvider::default().with_model_name(model_name.clone())
            } else {
                MockProvider::default()
            };
            Arc::new(provider)
        }

        ProviderKind::Groq | ProviderKind::OpenAI => {
            let api_key = resolve_api_key(config, provider_kind)?;
            let mut provider = match provider_kind {
                ProviderKind::OpenAI => OpenAiCompatProvider::openai(api_key),
                _ => OpenAiCompatProvider::groq(api_key),
            }
            .with_timeout(timeout);

            if let Some(ref model_name) = config.model_name {
                provider = provider.with_model(model_name.clone());
            }
            if let Some(ref base_url) = config.base_url {
                provider = provider.with_base_url(base_url.clone());
            }
            Arc::new(provider)
        }
    };

    let metadata = provider.metadata();
    tracing::info!(
        provider = %metadata.name,
        model = %metadata.model,
        base_url = metadata.base_url.as_deref().unwrap_or("-"),
        "Model provider ready"
    );
    Ok(provider)
}

/// Resolve the API key from `api_key_source` or the provider's default variable.
///
/// Accepted sources: `env:VAR`, `file:/path`, or a bare variable name.
pub fn resolve_api_key(config: &ModelConfig, kind: ProviderKind) -> Result<String> {
    let key = match config.api_key_source.as_deref() {
        Some(source) => {
            if let Some(path) = source.strip_prefix("file:") {
                load_api_key_from_file(path)?
            } else {
                load_api_key_from_env(source.strip_prefix("env:").unwrap_or(source))?
            }
        }
        None => match kind {
            ProviderKind::OpenAI => load_api_key_from_env(OPENAI_API_KEY_ENV)?,
            _ => load_api_key_from_env(GROQ_API_KEY_ENV)?,
        },
    };

    if key.trim().is_empty() {
        bail!("API key for provider '{}' is empty", kind.as_str());
    }
    Ok(key)
}

/// Load API key from environment variable
pub fn load_api_key_from_env(env_var: &str) -> Result<String> {
    std::env::var(env_var).context(format!("Environment variable {} not set", env_var))
}

/// Load API key from file
pub fn load_api_key_from_file(path: &str) -> Result<String> {
    std::fs::read_to_string(path)
        .context(format!("Failed to read API key from file: {}", path))
        .map(|s| s.trim().to_string())
}
