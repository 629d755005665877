use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use fluxgen_comfyui::GenerateError;
use fluxgen_core::error::CoreError;

/// Application-level error type for HTTP handlers.
///
/// Wraps domain errors from the core and orchestrator crates and adds
/// HTTP-specific variants. Implements [`IntoResponse`] to produce
/// consistent JSON error responses.
///
/// Note that `POST /generate` does NOT use this path for generation
/// failures -- it answers 200 with `success: false` and the failure
/// detail, so the client keeps the echoed prompt and parameters.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `fluxgen-core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// An orchestrator error reaching an HTTP boundary directly.
    #[error(transparent)]
    Generate(#[from] GenerateError),

    /// A prompt-enhancement failure from the OpenRouter client.
    #[error(transparent)]
    Enhance(#[from] fluxgen_enhance::EnhanceError),

    /// A filesystem error from the gallery layer.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// An internal error with a human-readable message.
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            // --- CoreError variants ---
            AppError::Core(core) => match core {
                CoreError::NotFound { entity, name } => (
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND",
                    format!("{entity} '{name}' not found"),
                ),
                CoreError::Validation(msg) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
                }
                CoreError::Internal(msg) => {
                    tracing::error!(error = %msg, "Internal core error");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "INTERNAL_ERROR",
                        "An internal error occurred".to_string(),
                    )
                }
            },

            // --- Orchestrator errors ---
            AppError::Generate(err) => classify_generate_error(err),

            // --- Enhancement errors ---
            AppError::Enhance(err) => {
                (StatusCode::BAD_GATEWAY, "ENHANCEMENT_FAILED", err.to_string())
            }

            // --- Filesystem errors ---
            AppError::Io(err) => {
                tracing::error!(error = %err, "Filesystem error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            }

            // --- HTTP-specific errors ---
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

/// Classify an orchestrator error into an HTTP status, error code, and
/// message.
///
/// - `Unreachable` maps to 503 (retry later).
/// - `Timeout` maps to 504.
/// - Everything else is an upstream failure: 502.
fn classify_generate_error(err: &GenerateError) -> (StatusCode, &'static str, String) {
    match err {
        GenerateError::Unreachable { .. } => (
            StatusCode::SERVICE_UNAVAILABLE,
            "ENGINE_UNREACHABLE",
            err.to_string(),
        ),
        GenerateError::Timeout { .. } => {
            (StatusCode::GATEWAY_TIMEOUT, "ENGINE_TIMEOUT", err.to_string())
        }
        GenerateError::Submission(_) => {
            (StatusCode::BAD_GATEWAY, "SUBMISSION_FAILED", err.to_string())
        }
        GenerateError::Execution(_) => {
            (StatusCode::BAD_GATEWAY, "EXECUTION_FAILED", err.to_string())
        }
        GenerateError::ResultMissing(_) => {
            (StatusCode::BAD_GATEWAY, "RESULT_MISSING", err.to_string())
        }
        GenerateError::Connection(_) => {
            (StatusCode::BAD_GATEWAY, "STREAM_FAILED", err.to_string())
        }
    }
}
