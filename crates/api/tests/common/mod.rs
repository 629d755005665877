use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Method, Request, Response, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use tokio::sync::RwLock;
use tower::ServiceExt;

use fluxgen_api::config::ServerConfig;
use fluxgen_api::gallery::Gallery;
use fluxgen_api::router::build_app_router;
use fluxgen_api::state::AppState;
use fluxgen_comfyui::{Generator, GeneratorConfig};

/// Build a test `ServerConfig` with safe defaults.
///
/// The engine URLs point at a port nothing listens on, so every engine
/// call fails fast and deterministically without a running ComfyUI.
pub fn test_config(output_dir: std::path::PathBuf) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        comfyui_url: "http://127.0.0.1:1".to_string(),
        comfyui_ws_url: "ws://127.0.0.1:1".to_string(),
        monitor_timeout: Duration::from_secs(5),
        output_dir,
        openrouter_api_key: String::new(),
    }
}

/// Build the full application router with all middleware layers.
///
/// Mirrors the state construction in `main.rs` so integration tests
/// exercise the same middleware stack (CORS, request ID, timeout,
/// tracing, panic recovery) that production uses. Returns the tempdir
/// backing the gallery so it outlives the test.
pub fn build_test_app() -> (tempfile::TempDir, Router) {
    let dir = tempfile::tempdir().expect("Failed to create temp output dir");
    let config = test_config(dir.path().to_path_buf());

    let generator = Generator::new(GeneratorConfig {
        api_url: config.comfyui_url.clone(),
        ws_url: config.comfyui_ws_url.clone(),
        monitor_timeout: config.monitor_timeout,
    });

    let state = AppState {
        config: Arc::new(config.clone()),
        generator: Arc::new(generator),
        gallery: Gallery::new(config.output_dir.clone()),
        enhancer: Arc::new(RwLock::new(None)),
    };

    (dir, build_app_router(state, &config))
}

/// Issue a GET request against the app.
pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

/// Issue a POST request with a JSON body against the app.
pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

/// Issue a DELETE request against the app.
pub async fn delete(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::DELETE)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

/// Collect a response body into parsed JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Assert a response is an error with the expected status and `code`.
pub async fn assert_error(response: Response<Body>, status: StatusCode, code: &str) {
    assert_eq!(response.status(), status);
    let json = body_json(response).await;
    assert_eq!(json["code"], code, "unexpected error payload: {json}");
    assert!(json["error"].is_string());
}
