use axum::extract::State;
use axum::{routing::get, Json, Router};
use serde::Serialize;

use fluxgen_enhance::ModelInfo;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Serialize)]
pub struct ModelsResponse {
    pub models: Vec<ModelInfo>,
}

/// GET /models -- list text-capable OpenRouter models for the
/// enhancement model picker.
///
/// Requires a configured API key; the listing itself degrades to empty
/// on upstream failure rather than erroring.
async fn list_models(State(state): State<AppState>) -> AppResult<Json<DataResponse<ModelsResponse>>> {
    let enhancer = state.enhancer.read().await;
    let Some(client) = enhancer.as_ref() else {
        return Err(AppError::BadRequest(
            "OpenRouter API key not configured".into(),
        ));
    };

    let models = client.list_models().await;
    Ok(Json(DataResponse {
        data: ModelsResponse { models },
    }))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/models", get(list_models))
}
