use axum::extract::State;
use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::state::AppState;

/// Health check response payload.
#[derive(Serialize)]
pub struct HealthResponse {
    /// Overall service status.
    pub status: &'static str,
    /// Crate version from Cargo.toml.
    pub version: &'static str,
    /// Model family the workflow builder targets.
    pub model: &'static str,
    /// Whether the ComfyUI engine answered its stats endpoint.
    pub engine_reachable: bool,
    /// Whether an OpenRouter API key is configured.
    pub openrouter_configured: bool,
    /// ISO-8601 timestamp of the check.
    pub timestamp: String,
}

/// GET /health -- returns service and engine health.
///
/// `status` is `ok` even when the engine is down: the API itself is up,
/// and `engine_reachable` carries the engine's state separately so the
/// frontend can show a targeted warning.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let engine_reachable = state.generator.check_reachable().await;
    let openrouter_configured = state.enhancer.read().await.is_some();

    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        model: fluxgen_comfyui::workflow::MODEL_NAME,
        engine_reachable,
        openrouter_configured,
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

/// Mount health check routes.
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
