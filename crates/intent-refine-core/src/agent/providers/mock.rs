//! Mock provider for tests and offline runs.

use crate::agent::model::{
    ChatMessage, GenerationConfig, ModelProvider, ModelResponse, ProviderError, ProviderKind,
    ProviderMetadata,
};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

const MOCK_MODEL: &str = "mock-model";

/// Canned reply used when the service runs with `provider = "mock"`
pub const DEFAULT_MOCK_RESPONSE: &str =
    r#"{"intent":"SMALL_TALK_HELP","reply":"I'm here to help.","entities":{}}"#;

/// Returns a fixed response, or a fixed error, and counts calls
#[derive(Debug, Clone)]
pub struct MockProvider {
    outcome: Result<String, ProviderError>,
    model_name: String,
    calls: Arc<AtomicUsize>,
}

impl MockProvider {
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            outcome: Ok(response.into()),
            model_name: MOCK_MODEL.to_string(),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Every call fails with `error`
    pub fn failing(error: ProviderError) -> Self {
        Self {
            outcome: Err(error),
            model_name: MOCK_MODEL.to_string(),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_model_name(mut self, model_name: impl Into<String>) -> Self {
        self.model_name = model_name.into();
        self
    }

    /// Number of `generate` calls so far, shared across clones
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new(DEFAULT_MOCK_RESPONSE)
    }
}

#[async_trait]
impl ModelProvider for MockProvider {
    async fn generate(
        &self,
        _messages: &[ChatMessage],
        _config: &GenerationConfig,
    ) -> Result<ModelResponse, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let content = self.outcome.clone()?;
        Ok(ModelResponse {
            content,
            model: self.model_name.clone(),
            usage: None,
            finish_reason: Some("stop".to_string()),
        })
    }

    fn metadata(&self) -> ProviderMetadata {
        ProviderMetadata {
            name: "Mock".to_string(),
            model: self.model_name.clone(),
            base_url: None,
        }
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Mock
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_returns_response() {
        let provider = MockProvider::new("hello");
        let response = provider
            .generate(&[ChatMessage::user("hi")], &GenerationConfig::default())
            .await
            .unwrap();
        assert_eq!(response.content, "hello");
        assert_eq!(response.model, "mock-model");
        assert_eq!(provider.call_count(), 1);
    }

    #[test]
    fn test_mock_metadata_reports_model_name() {
        let metadata = MockProvider::default().with_model_name("canned").metadata();
        assert_eq!(metadata.name, "Mock");
        assert_eq!(metadata.model, "canned");
        assert!(metadata.base_url.is_none());
    }

    #[tokio::test]
    async fn test_mock_failing() {
        let provider = MockProvider::failing(ProviderError::Timeout);
        let clone = provider.clone();
        let err = clone
            .generate(&[], &GenerationConfig::default())
            .await
            .unwrap_err();
        assert_eq!(err, ProviderError::Timeout);
        assert_eq!(provider.call_count(), 1);
    }
}
