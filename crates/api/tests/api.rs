//! Integration tests for the HTTP surface.
//!
//! These run without a ComfyUI engine or an OpenRouter key: the test
//! config points the engine URLs at a closed port, so every upstream
//! call fails fast and the tests exercise the degraded paths the
//! frontend has to handle.

mod common;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use common::{assert_error, body_json, build_test_app, delete, get, post_json};
use serde_json::json;
use tower::ServiceExt;

// ---------------------------------------------------------------------------
// Health and general HTTP behaviour
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_check_reports_unreachable_engine() {
    let (_dir, app) = build_test_app();
    let response = get(app, "/health").await;

    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
    assert_eq!(json["engine_reachable"], false);
    assert_eq!(json["openrouter_configured"], false);
    assert!(json["timestamp"].is_string());
}

#[tokio::test]
async fn unknown_route_returns_404() {
    let (_dir, app) = build_test_app();
    let response = get(app, "/this-route-does-not-exist").await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn response_contains_x_request_id_header() {
    let (_dir, app) = build_test_app();
    let response = get(app, "/health").await;

    let request_id = response.headers().get("x-request-id");
    assert!(
        request_id.is_some(),
        "Response must contain an x-request-id header"
    );
    let id_str = request_id.unwrap().to_str().unwrap();
    assert_eq!(id_str.len(), 36, "x-request-id should be a UUID string");
}

#[tokio::test]
async fn cors_preflight_returns_correct_headers() {
    let (_dir, app) = build_test_app();

    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/generate")
        .header("Origin", "http://localhost:5173")
        .header("Access-Control-Request-Method", "POST")
        .header("Access-Control-Request-Headers", "content-type")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let allow_origin = response
        .headers()
        .get("access-control-allow-origin")
        .expect("Missing Access-Control-Allow-Origin header")
        .to_str()
        .unwrap();
    assert_eq!(allow_origin, "http://localhost:5173");
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[tokio::test]
async fn config_exposes_preset_tables() {
    let (_dir, app) = build_test_app();
    let response = get(app, "/config").await;

    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    let data = &json["data"];
    assert_eq!(data["openrouter_configured"], false);
    assert_eq!(data["default_quality_preset"], "mid");
    assert_eq!(data["quality_presets"].as_array().unwrap().len(), 3);
    assert_eq!(data["resolution_presets"].as_array().unwrap().len(), 6);
    // Preset entries carry everything the frontend renders.
    assert_eq!(data["quality_presets"][0]["id"], "basic");
    assert!(data["resolution_presets"][0]["width"].is_u64());
}

#[tokio::test]
async fn config_update_without_key_is_a_noop() {
    let (_dir, app) = build_test_app();
    let response = post_json(app, "/config", json!({})).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["success"], true);
}

#[tokio::test]
async fn config_update_rejects_unverifiable_key() {
    // Key validation calls OpenRouter; without network the check fails
    // and the key must be rejected rather than silently accepted.
    let (_dir, app) = build_test_app();
    let response = post_json(app, "/config", json!({ "openrouter_api_key": "sk-test" })).await;

    assert_error(response, StatusCode::BAD_REQUEST, "BAD_REQUEST").await;
}

// ---------------------------------------------------------------------------
// Enhancement surface without a configured key
// ---------------------------------------------------------------------------

#[tokio::test]
async fn models_require_configured_key() {
    let (_dir, app) = build_test_app();
    let response = get(app, "/models").await;

    assert_error(response, StatusCode::BAD_REQUEST, "BAD_REQUEST").await;
}

#[tokio::test]
async fn enhance_requires_configured_key() {
    let (_dir, app) = build_test_app();
    let response = post_json(app, "/enhance", json!({ "prompt": "a cat" })).await;

    assert_error(response, StatusCode::BAD_REQUEST, "BAD_REQUEST").await;
}

#[tokio::test]
async fn enhance_rejects_empty_prompt() {
    let (_dir, app) = build_test_app();
    let response = post_json(app, "/enhance", json!({ "prompt": "" })).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ---------------------------------------------------------------------------
// Generation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn generate_with_unreachable_engine_answers_200_with_failure() {
    let (_dir, app) = build_test_app();
    let response = post_json(app, "/generate", json!({ "prompt": "a red fox" })).await;

    // Generation failures keep the 200 + success flag shape so the
    // frontend retains the echoed prompt.
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["original_prompt"], "a red fox");
    assert!(json["error"].as_str().unwrap().contains("not reachable"));
    assert!(json.get("image_base64").is_none());
}

#[tokio::test]
async fn generate_rejects_empty_prompt() {
    let (_dir, app) = build_test_app();
    let response = post_json(app, "/generate", json!({ "prompt": "" })).await;

    assert_error(response, StatusCode::BAD_REQUEST, "BAD_REQUEST").await;
}

#[tokio::test]
async fn generate_reports_invalid_dimensions_as_failure() {
    let (_dir, app) = build_test_app();
    let response = post_json(
        app,
        "/generate",
        json!({ "prompt": "a cat", "width": 10_000 }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["success"], false);
    assert!(json["error"].as_str().unwrap().contains("width"));
}

// ---------------------------------------------------------------------------
// Gallery
// ---------------------------------------------------------------------------

#[tokio::test]
async fn gallery_starts_empty() {
    let (_dir, app) = build_test_app();
    let response = get(app, "/gallery").await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["images"], json!([]));
}

#[tokio::test]
async fn gallery_lists_saved_images() {
    let (dir, app) = build_test_app();
    std::fs::write(dir.path().join("flux_20260101_000000000.png"), b"x").unwrap();
    std::fs::write(
        dir.path().join("flux_20260101_000000000.json"),
        json!({ "prompt": "saved" }).to_string(),
    )
    .unwrap();

    let response = get(app, "/gallery").await;
    let json = body_json(response).await;

    let images = json["data"]["images"].as_array().unwrap();
    assert_eq!(images.len(), 1);
    assert_eq!(images[0]["filename"], "flux_20260101_000000000.png");
    assert_eq!(images[0]["url"], "/outputs/flux_20260101_000000000.png");
    assert_eq!(images[0]["metadata"]["prompt"], "saved");
}

#[tokio::test]
async fn gallery_delete_removes_files() {
    let (dir, app) = build_test_app();
    std::fs::write(dir.path().join("flux_a.png"), b"x").unwrap();
    std::fs::write(dir.path().join("flux_a.json"), b"{}").unwrap();

    let response = delete(app, "/gallery/flux_a.png").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(!dir.path().join("flux_a.png").exists());
    assert!(!dir.path().join("flux_a.json").exists());
}

#[tokio::test]
async fn gallery_delete_of_missing_image_is_404() {
    let (_dir, app) = build_test_app();
    let response = delete(app, "/gallery/flux_missing.png").await;

    assert_error(response, StatusCode::NOT_FOUND, "NOT_FOUND").await;
}

// ---------------------------------------------------------------------------
// Static outputs mount
// ---------------------------------------------------------------------------

#[tokio::test]
async fn outputs_serves_saved_files() {
    let (dir, app) = build_test_app();
    std::fs::write(dir.path().join("flux_a.png"), b"png-bytes").unwrap();

    let response = get(app, "/outputs/flux_a.png").await;
    assert_eq!(response.status(), StatusCode::OK);
}
