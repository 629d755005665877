use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use fluxgen_core::presets::{DEFAULT_QUALITY_PRESET, QUALITY_PRESETS, RESOLUTION_PRESETS};
use fluxgen_enhance::OpenRouterClient;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// Configuration status as exposed to the frontend.
#[derive(Serialize)]
pub struct ConfigStatus {
    /// Model family the workflow builder targets.
    pub model: &'static str,
    /// ComfyUI engine base URL.
    pub comfyui_url: String,
    /// Whether an OpenRouter API key is configured.
    pub openrouter_configured: bool,
    /// Default quality preset id.
    pub default_quality_preset: &'static str,
    /// Available quality presets.
    pub quality_presets: &'static [fluxgen_core::presets::QualityPreset],
    /// Available resolution presets.
    pub resolution_presets: &'static [fluxgen_core::presets::ResolutionPreset],
}

/// GET /config -- current configuration status plus the preset tables
/// the frontend renders its controls from.
async fn get_config(State(state): State<AppState>) -> Json<DataResponse<ConfigStatus>> {
    let openrouter_configured = state.enhancer.read().await.is_some();

    Json(DataResponse {
        data: ConfigStatus {
            model: fluxgen_comfyui::workflow::MODEL_NAME,
            comfyui_url: state.config.comfyui_url.clone(),
            openrouter_configured,
            default_quality_preset: DEFAULT_QUALITY_PRESET,
            quality_presets: QUALITY_PRESETS,
            resolution_presets: RESOLUTION_PRESETS,
        },
    })
}

/// Runtime configuration update.
#[derive(Debug, Deserialize)]
pub struct ConfigUpdateRequest {
    /// New OpenRouter API key. Omitted or empty means "leave as is".
    #[serde(default)]
    pub openrouter_api_key: Option<String>,
}

#[derive(Serialize)]
pub struct ConfigUpdateResponse {
    pub success: bool,
    pub message: &'static str,
}

/// POST /config -- update the OpenRouter API key at runtime.
///
/// The key is validated against OpenRouter before it is accepted; an
/// invalid key is rejected with 400 and the previous key stays active.
async fn update_config(
    State(state): State<AppState>,
    Json(req): Json<ConfigUpdateRequest>,
) -> AppResult<Json<ConfigUpdateResponse>> {
    let Some(key) = req.openrouter_api_key.filter(|k| !k.trim().is_empty()) else {
        return Ok(Json(ConfigUpdateResponse {
            success: true,
            message: "No changes",
        }));
    };

    let client = OpenRouterClient::new(key);
    if !client.check_api_key().await {
        return Err(AppError::BadRequest("Invalid OpenRouter API key".into()));
    }

    *state.enhancer.write().await = Some(client);
    tracing::info!("OpenRouter API key updated");

    Ok(Json(ConfigUpdateResponse {
        success: true,
        message: "API key updated",
    }))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/config", get(get_config).post(update_config))
}
