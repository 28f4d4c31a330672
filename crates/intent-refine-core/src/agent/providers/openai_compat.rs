//! OpenAI-compatible Chat Completions Provider
//!
//! Talks to any endpoint implementing `POST {base_url}/chat/completions`,
//! which covers both Groq and OpenAI.

use crate::agent::model::{
    ChatMessage, GenerationConfig, ModelProvider, ModelResponse, ProviderError, ProviderKind,
    ProviderMetadata, TokenUsage,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

pub const GROQ_API_URL: &str = "https://api.groq.com/openai/v1";
pub const OPENAI_API_URL: &str = "https://api.openai.com/v1";
pub const GROQ_DEFAULT_MODEL: &str = "llama-3.1-8b-instant";
pub const OPENAI_DEFAULT_MODEL: &str = "gpt-4o-mini";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Chat completions request body
#[derive(Debug, Clone, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Clone, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

/// Chat completions response body
#[derive(Debug, Clone, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    model: String,
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Debug, Clone, Deserialize)]
struct Choice {
    message: ChoiceMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct Usage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

/// Provider for OpenAI-compatible chat completion APIs
#[derive(Clone)]
pub struct OpenAiCompatProvider {
    /// HTTP client carrying the request timeout
    client: reqwest::Client,
    kind: ProviderKind,
    /// Base URL without the `/chat/completions` suffix
    base_url: String,
    api_key: String,
    model: String,
}

impl fmt::Debug for OpenAiCompatProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiCompatProvider")
            .field("kind", &self.kind)
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .finish()
    }
}

impl OpenAiCompatProvider {
    /// Groq with its default model
    pub fn groq(api_key: impl Into<String>) -> Self {
        Self::new(ProviderKind::Groq, GROQ_API_URL, api_key, GROQ_DEFAULT_MODEL)
    }

    /// OpenAI with its default model
    pub fn openai(api_key: impl Into<String>) -> Self {
        Self::new(ProviderKind::OpenAI, OPENAI_API_URL, api_key, OPENAI_DEFAULT_MODEL)
    }

    fn new(
        kind: ProviderKind,
        base_url: &str,
        api_key: impl Into<String>,
        model: &str,
    ) -> Self {
        Self {
            client: build_client(DEFAULT_TIMEOUT),
            kind,
            base_url: base_url.to_string(),
            api_key: api_key.into(),
            model: model.to_string(),
        }
    }

    /// Set the model to use
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Point at a different API root
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Bound each request, connect through last body byte
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.client = build_client(timeout);
        self
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    fn build_request<'a>(
        &'a self,
        messages: &'a [ChatMessage],
        config: &GenerationConfig,
    ) -> ChatCompletionRequest<'a> {
        ChatCompletionRequest {
            model: &self.model,
            messages,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            top_p: config.top_p,
            response_format: config.json_response.then_some(ResponseFormat {
                kind: "json_object",
            }),
        }
    }
}

fn build_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|e| {
            tracing::warn!("Falling back to default HTTP client: {}", e);
            reqwest::Client::new()
        })
}

#[async_trait]
impl ModelProvider for OpenAiCompatProvider {
    async fn generate(
        &self,
        messages: &[ChatMessage],
        config: &GenerationConfig,
    ) -> Result<ModelResponse, ProviderError> {
        let request = self.build_request(messages, config);

        let response = self
            .client
            .post(self.completions_url())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api { status, body });
        }

        let body = response.text().await?;
        let api_response: ChatCompletionResponse = serde_json::from_str(&body)
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        let choice = api_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::InvalidResponse("response has no choices".into()))?;

        Ok(ModelResponse {
            content: choice.message.content.unwrap_or_default(),
            model: if api_response.model.is_empty() {
                self.model.clone()
            } else {
                api_response.model
            },
            usage: api_response.usage.map(|u| TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            }),
            finish_reason: choice.finish_reason,
        })
    }

    fn metadata(&self) -> ProviderMetadata {
        let name = match self.kind {
            ProviderKind::OpenAI => "OpenAI",
            _ => "Groq",
        };
        ProviderMetadata {
            name: name.to_string(),
            model: self.model.clone(),
            base_url: Some(self.base_url.clone()),
        }
    }

    fn kind(&self) -> ProviderKind {
        self.kind
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn messages() -> Vec<ChatMessage> {
        vec![ChatMessage::system("classify"), ChatMessage::user("torch on")]
    }

    fn json_config() -> GenerationConfig {
        GenerationConfig {
            temperature: Some(0.0),
            max_tokens: Some(150),
            json_response: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_groq_defaults() {
        let provider = OpenAiCompatProvider::groq("key");
        assert_eq!(provider.kind(), ProviderKind::Groq);
        assert_eq!(provider.metadata().model, GROQ_DEFAULT_MODEL);
        assert_eq!(
            provider.completions_url(),
            "https://api.groq.com/openai/v1/chat/completions"
        );
        assert_eq!(provider.metadata().name, "Groq");
    }

    #[test]
    fn test_metadata_follows_model_override() {
        let metadata = OpenAiCompatProvider::openai("key")
            .with_model("gpt-4o")
            .with_base_url("http://localhost:9/v1")
            .metadata();
        assert_eq!(metadata.name, "OpenAI");
        assert_eq!(metadata.model, "gpt-4o");
        assert_eq!(metadata.base_url.as_deref(), Some("http://localhost:9/v1"));
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let provider = OpenAiCompatProvider::groq("gsk-secret-value");
        let rendered = format!("{:?}", provider);
        assert!(!rendered.contains("gsk-secret-value"));
        assert!(rendered.contains("<redacted>"));
        assert!(rendered.contains(GROQ_DEFAULT_MODEL));
    }

    #[test]
    fn test_with_base_url_trims_slash() {
        let provider = OpenAiCompatProvider::openai("key").with_base_url("http://localhost:9/v1/");
        assert_eq!(provider.completions_url(), "http://localhost:9/v1/chat/completions");
    }

    #[test]
    fn test_build_request() {
        let provider = OpenAiCompatProvider::groq("key");
        let messages = messages();
        let request = provider.build_request(&messages, &json_config());
        let value = serde_json::to_value(&request).unwrap();

        assert_eq!(value["model"], GROQ_DEFAULT_MODEL);
        assert_eq!(value["messages"][0]["role"], "system");
        assert_eq!(value["messages"][1]["content"], "torch on");
        assert_eq!(value["max_tokens"], 150);
        assert_eq!(value["response_format"]["type"], "json_object");
        assert!(value.get("top_p").is_none());
    }

    #[tokio::test]
    async fn test_generate_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer test-key"))
            .and(body_partial_json(json!({ "response_format": { "type": "json_object" } })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "model": "llama-3.1-8b-instant",
                "choices": [{
                    "message": { "role": "assistant", "content": "{\"intent\":\"FLASHLIGHT_ON\"}" },
                    "finish_reason": "stop"
                }],
                "usage": { "prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15 }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let provider = OpenAiCompatProvider::groq("test-key").with_base_url(server.uri());
        let response = provider.generate(&messages(), &json_config()).await.unwrap();

        assert_eq!(response.content, "{\"intent\":\"FLASHLIGHT_ON\"}");
        assert_eq!(response.finish_reason.as_deref(), Some("stop"));
        assert_eq!(response.usage.unwrap().total_tokens, 15);
    }

    #[tokio::test]
    async fn test_generate_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
            .mount(&server)
            .await;

        let provider = OpenAiCompatProvider::groq("test-key").with_base_url(server.uri());
        let err = provider.generate(&messages(), &json_config()).await.unwrap_err();

        assert_eq!(
            err,
            ProviderError::Api {
                status: 429,
                body: "rate limited".into()
            }
        );
    }

    #[tokio::test]
    async fn test_generate_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "choices": [] }))
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let provider = OpenAiCompatProvider::groq("test-key")
            .with_base_url(server.uri())
            .with_timeout(Duration::from_millis(50));
        let err = provider.generate(&messages(), &json_config()).await.unwrap_err();

        assert_eq!(err, ProviderError::Timeout);
    }

    #[tokio::test]
    async fn test_generate_invalid_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let provider = OpenAiCompatProvider::groq("test-key").with_base_url(server.uri());
        let err = provider.generate(&messages(), &json_config()).await.unwrap_err();

        assert!(matches!(err, ProviderError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_generate_no_choices() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
            .mount(&server)
            .await;

        let provider = OpenAiCompatProvider::groq("test-key").with_base_url(server.uri());
        let err = provider.generate(&messages(), &json_config()).await.unwrap_err();

        assert!(matches!(err, ProviderError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport() {
        let provider =
            OpenAiCompatProvider::groq("test-key").with_base_url("http://127.0.0.1:1");
        let err = provider.generate(&messages(), &json_config()).await.unwrap_err();

        assert!(matches!(err, ProviderError::Transport(_)));
    }
}
