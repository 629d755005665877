use axum::extract::State;
use axum::{routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Default model for prompt enhancement.
pub const DEFAULT_ENHANCEMENT_MODEL: &str = "anthropic/claude-3-haiku";

#[derive(Debug, Deserialize, Validate)]
pub struct EnhanceRequest {
    #[validate(length(min = 1, max = 2000, message = "prompt must be 1-2000 characters"))]
    pub prompt: String,
    #[serde(default = "default_model")]
    pub model: String,
}

fn default_model() -> String {
    DEFAULT_ENHANCEMENT_MODEL.to_string()
}

#[derive(Serialize)]
pub struct EnhanceResponse {
    pub success: bool,
    pub original: String,
    pub enhanced: String,
}

/// POST /enhance -- rewrite a prompt into a detailed image prompt.
async fn enhance(
    State(state): State<AppState>,
    Json(req): Json<EnhanceRequest>,
) -> AppResult<Json<EnhanceResponse>> {
    req.validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let enhancer = state.enhancer.read().await;
    let Some(client) = enhancer.as_ref() else {
        return Err(AppError::BadRequest(
            "OpenRouter API key not configured".into(),
        ));
    };

    let enhanced = client.enhance_prompt(&req.prompt, &req.model).await?;

    Ok(Json(EnhanceResponse {
        success: true,
        original: req.prompt,
        enhanced,
    }))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/enhance", post(enhance))
}
