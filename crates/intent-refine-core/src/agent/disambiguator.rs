//! Disambiguation Client
//!
//! Sends the query and ranked candidates to the language model and parses
//! its JSON decision. Failures are typed; [`Disambiguator::decide_or_fallback`]
//! applies the availability policy and always yields a decision.

use crate::agent::model::{ChatMessage, GenerationConfig, ModelProvider, ProviderError};
use crate::agent::prompt::PromptTemplate;
use crate::retrieval::Candidate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

/// Intent returned when the real intent cannot be determined
pub const CLARIFY_INTENT: &str = "SMALL_TALK_HELP";
/// Reply used when the model call fails outright
pub const FALLBACK_REPLY: &str = "Could you rephrase that?";
/// Reply used when the model omits one
pub const DEFAULT_REPLY: &str = "I'm here to help.";

/// Classification outcome returned to clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub intent: String,
    pub reply: String,
    pub entities: BTreeMap<String, Option<String>>,
}

impl Decision {
    /// Decision served when the model cannot be used
    pub fn fallback() -> Self {
        Self {
            intent: CLARIFY_INTENT.to_string(),
            reply: FALLBACK_REPLY.to_string(),
            entities: BTreeMap::new(),
        }
    }

    /// Build from the model's JSON object, defaulting missing fields.
    ///
    /// Entity values are coerced to strings; `null` stays `None`.
    pub fn from_json_object(object: &Map<String, Value>) -> Self {
        let intent = object
            .get("intent")
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(CLARIFY_INTENT)
            .to_string();

        let reply = object
            .get("reply")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_REPLY)
            .to_string();

        let entities = match object.get("entities") {
            Some(Value::Object(map)) => map
                .iter()
                .map(|(field, value)| (field.clone(), entity_value(value)))
                .collect(),
            _ => BTreeMap::new(),
        };

        Self {
            intent,
            reply,
            entities,
        }
    }
}

fn entity_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Why a disambiguation attempt produced no decision
#[derive(Debug, Clone, Error, PartialEq)]
pub enum DisambiguationError {
    #[error("model request timed out")]
    Timeout,

    #[error("model transport error: {0}")]
    Transport(String),

    #[error("model provider returned {status}: {body}")]
    Provider { status: u16, body: String },

    #[error("malformed model output: {0}")]
    MalformedResponse(String),
}

impl From<ProviderError> for DisambiguationError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::Timeout => Self::Timeout,
            ProviderError::Transport(message) => Self::Transport(message),
            ProviderError::Api { status, body } => Self::Provider { status, body },
            ProviderError::InvalidResponse(message) => Self::MalformedResponse(message),
        }
    }
}

impl DisambiguationError {
    /// Short label for logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::Transport(_) => "transport",
            Self::Provider { .. } => "provider_error",
            Self::MalformedResponse(_) => "malformed_response",
        }
    }
}

/// Formats the prompt, calls the model and parses the decision
#[derive(Clone)]
pub struct Disambiguator {
    provider: Arc<dyn ModelProvider>,
    template: PromptTemplate,
    generation: GenerationConfig,
}

impl Disambiguator {
    pub fn new(provider: Arc<dyn ModelProvider>) -> Self {
        Self {
            provider,
            template: PromptTemplate::default(),
            generation: GenerationConfig {
                temperature: Some(0.0),
                max_tokens: Some(150),
                top_p: None,
                json_response: true,
            },
        }
    }

    pub fn with_template(mut self, template: PromptTemplate) -> Self {
        self.template = template;
        self
    }

    pub fn with_generation_config(mut self, generation: GenerationConfig) -> Self {
        self.generation = generation;
        self
    }

    /// System prompt plus the raw query as the user turn
    pub fn build_messages(&self, text: &str, candidates: &[Candidate]) -> Vec<ChatMessage> {
        vec![
            ChatMessage::system(self.template.render(text, candidates)),
            ChatMessage::user(text),
        ]
    }

    /// One model call, no retries
    pub async fn decide(
        &self,
        text: &str,
        candidates: &[Candidate],
    ) -> Result<Decision, DisambiguationError> {
        let messages = self.build_messages(text, candidates);
        let response = self.provider.generate(&messages, &self.generation).await?;
        parse_decision(&response.content)
    }

    /// [`decide`](Self::decide), substituting [`Decision::fallback`] on any failure
    pub async fn decide_or_fallback(&self, text: &str, candidates: &[Candidate]) -> Decision {
        match self.decide(text, candidates).await {
            Ok(decision) => decision,
            Err(e) => {
                tracing::warn!(kind = e.kind(), error = %e, "Disambiguation failed, using fallback");
                Decision::fallback()
            }
        }
    }
}

/// Parse model output into a decision; code fences around the JSON are tolerated
pub fn parse_decision(content: &str) -> Result<Decision, DisambiguationError> {
    let body = strip_code_fence(content.trim());
    let value: Value = serde_json::from_str(body)
        .map_err(|e| DisambiguationError::MalformedResponse(e.to_string()))?;

    match value {
        Value::Object(object) => Ok(Decision::from_json_object(&object)),
        other => Err(DisambiguationError::MalformedResponse(format!(
            "expected a JSON object, got {}",
            json_type(&other)
        ))),
    }
}

fn strip_code_fence(content: &str) -> &str {
    let Some(rest) = content.strip_prefix("```") else {
        return content;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
