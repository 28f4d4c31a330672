/// API request and response models
use crate::agent::Decision;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Body of `POST /refine`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefineRequest {
    /// Transcript to classify
    pub text: String,
}

/// Result of `POST /refine`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefineResponse {
    pub intent: String,
    pub reply: String,
    pub entities: BTreeMap<String, Option<String>>,
}

impl From<Decision> for RefineResponse {
    fn from(decision: Decision) -> Self {
        Self {
            intent: decision.intent,
            reply: decision.reply,
            entities: decision.entities,
        }
    }
}

/// Body of `GET /`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
    pub message: String,
}

/// Body of `GET /health`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    /// Distinct intents in the example store
    pub intents: usize,
    /// Total example utterances
    pub examples: usize,
}
