use std::time::Instant;

use axum::extract::State;
use axum::{routing::post, Json, Router};
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use validator::Validate;

use fluxgen_core::generation::{validate_params, GenerationParams, DEFAULT_HEIGHT, DEFAULT_WIDTH};
use fluxgen_core::presets::{quality_preset, DEFAULT_QUALITY_PRESET};

use crate::error::{AppError, AppResult};
use crate::routes::enhance::DEFAULT_ENHANCEMENT_MODEL;
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct GenerateRequest {
    #[validate(length(min = 1, max = 2000, message = "prompt must be 1-2000 characters"))]
    pub prompt: String,
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    /// Overrides the quality preset's step count when present.
    pub steps: Option<u32>,
    /// Overrides the quality preset's guidance when present.
    pub guidance: Option<f64>,
    #[serde(default = "default_quality")]
    pub quality_preset: String,
    pub seed: Option<u64>,
    #[serde(default = "default_true")]
    pub enhance_prompt: bool,
    #[serde(default = "default_model")]
    pub enhancement_model: String,
}

fn default_width() -> u32 {
    DEFAULT_WIDTH
}

fn default_height() -> u32 {
    DEFAULT_HEIGHT
}

fn default_quality() -> String {
    DEFAULT_QUALITY_PRESET.to_string()
}

fn default_true() -> bool {
    true
}

fn default_model() -> String {
    DEFAULT_ENHANCEMENT_MODEL.to_string()
}

/// Response for `POST /generate`.
///
/// Generation failures answer 200 with `success: false` and the failure
/// detail in `error`, so the frontend keeps the echoed prompt and can
/// offer a retry. Only malformed requests get a non-200 status.
#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_base64: Option<String>,
    pub original_prompt: String,
    pub enhanced_prompt: Option<String>,
    pub metadata: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl GenerateResponse {
    fn failure(original_prompt: String, enhanced_prompt: Option<String>, error: String) -> Self {
        Self {
            success: false,
            image_url: None,
            image_base64: None,
            original_prompt,
            enhanced_prompt,
            metadata: json!({}),
            error: Some(error),
        }
    }
}

/// POST /generate -- run one text-to-image job end to end.
///
/// Resolves the quality preset, optionally enhances the prompt (falling
/// back to the original on enhancement failure), drives the engine
/// through the generation orchestrator, persists the result to the
/// gallery, and returns the image inline as base64 plus its serving URL.
async fn generate(
    State(state): State<AppState>,
    Json(req): Json<GenerateRequest>,
) -> AppResult<Json<GenerateResponse>> {
    req.validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let preset = quality_preset(&req.quality_preset);
    let steps = req.steps.unwrap_or(preset.steps);
    let guidance = req.guidance.unwrap_or(preset.guidance);

    // Enhancement is best-effort: a failed rewrite falls back to the
    // user's own prompt instead of failing the generation.
    let mut enhanced_prompt = None;
    if req.enhance_prompt {
        if let Some(client) = state.enhancer.read().await.as_ref() {
            match client.enhance_prompt(&req.prompt, &req.enhancement_model).await {
                Ok(enhanced) => enhanced_prompt = Some(enhanced),
                Err(e) => {
                    tracing::warn!(error = %e, "Prompt enhancement failed, using original prompt");
                }
            }
        }
    }
    let final_prompt = enhanced_prompt.clone().unwrap_or_else(|| req.prompt.clone());

    let params = GenerationParams {
        prompt: final_prompt,
        width: req.width,
        height: req.height,
        steps,
        guidance,
        seed: req.seed,
    };
    if let Err(e) = validate_params(&params) {
        return Ok(Json(GenerateResponse::failure(
            req.prompt,
            enhanced_prompt,
            e.to_string(),
        )));
    }

    let started = Instant::now();
    let result = match state.generator.generate(&params, None).await {
        Ok(result) => result,
        Err(e) => {
            tracing::error!(error = %e, "Generation failed");
            return Ok(Json(GenerateResponse::failure(
                req.prompt,
                enhanced_prompt,
                e.to_string(),
            )));
        }
    };
    let generation_time = started.elapsed().as_secs_f64();

    let mut metadata = match serde_json::to_value(&result.metadata) {
        Ok(Value::Object(map)) => map,
        _ => Default::default(),
    };
    metadata.insert("original_prompt".into(), json!(req.prompt));
    metadata.insert("enhanced_prompt".into(), json!(enhanced_prompt));
    metadata.insert("timestamp".into(), json!(chrono::Utc::now().to_rfc3339()));
    metadata.insert(
        "generation_time".into(),
        json!((generation_time * 100.0).round() / 100.0),
    );
    metadata.insert("quality_preset".into(), json!(preset.id));
    metadata.insert("variant".into(), json!(result.variant));
    let metadata = Value::Object(metadata);

    let filename = match state.gallery.save(&result.bytes, &metadata).await {
        Ok(filename) => filename,
        Err(e) => {
            tracing::error!(error = %e, "Failed to persist generated image");
            return Ok(Json(GenerateResponse::failure(
                req.prompt,
                enhanced_prompt,
                format!("failed to save image: {e}"),
            )));
        }
    };

    let image_base64 = base64::engine::general_purpose::STANDARD.encode(&result.bytes);

    tracing::info!(
        filename = %filename,
        variant = %result.variant,
        seconds = generation_time,
        "Generation complete"
    );

    Ok(Json(GenerateResponse {
        success: true,
        image_url: Some(format!("/outputs/{filename}")),
        image_base64: Some(image_base64),
        original_prompt: req.prompt,
        enhanced_prompt,
        metadata,
        error: None,
    }))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/generate", post(generate))
}
