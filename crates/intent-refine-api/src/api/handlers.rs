/// API request handlers
use crate::api::models::*;
use crate::service::RefineService;
use axum::{
    extract::{Json, State},
    response::IntoResponse,
};
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<RefineService>,
}

impl AppState {
    pub fn new(service: RefineService) -> Self {
        Self {
            service: Arc::new(service),
        }
    }
}

/// Liveness banner
pub async fn root() -> impl IntoResponse {
    Json(StatusResponse {
        status: "online".to_string(),
        message: "LLM Intent Server".to_string(),
    })
}

/// Health check endpoint with example store counts
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".to_string(),
        intents: state.service.intent_count(),
        examples: state.service.example_count(),
    })
}

/// Classify a transcript.
///
/// Always 200: model failures are folded into the fallback decision by the
/// service.
pub async fn refine(
    State(state): State<AppState>,
    Json(request): Json<RefineRequest>,
) -> impl IntoResponse {
    tracing::debug!(text = %request.text, "Refine request");
    let decision = state.service.refine(&request.text).await;
    Json(RefineResponse::from(decision))
}
