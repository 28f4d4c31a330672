/// HTTP API for intent classification
///
/// This module provides:
/// - `GET /` liveness banner
/// - `GET /health` example store counts
/// - `POST /refine` transcript classification
pub mod handlers;
pub mod models;
pub mod server;

pub use handlers::AppState;
pub use models::{HealthResponse, RefineRequest, RefineResponse, StatusResponse};
pub use server::{ApiConfig, ApiServer};
