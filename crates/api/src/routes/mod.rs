pub mod config;
pub mod enhance;
pub mod gallery;
pub mod generate;
pub mod health;
pub mod models;

use axum::Router;

use crate::state::AppState;

/// Compose all API route trees.
///
/// Route hierarchy (all root-level, matching the frontend's fetch paths):
///
/// ```text
/// /health              GET            service + engine status
/// /config              GET, POST      configuration status / API key update
/// /models              GET            available enhancement models
/// /enhance             POST           prompt enhancement
/// /generate            POST           text-to-image generation
/// /gallery             GET            saved image listing
/// /gallery/{filename}  DELETE         saved image removal
/// ```
///
/// The static `/outputs` mount is added in [`crate::router`], not here.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(config::router())
        .merge(models::router())
        .merge(enhance::router())
        .merge(generate::router())
        .merge(gallery::router())
}
