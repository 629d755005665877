use std::sync::Arc;

use tokio::sync::RwLock;

use fluxgen_comfyui::Generator;
use fluxgen_enhance::OpenRouterClient;

use crate::config::ServerConfig;
use crate::gallery::Gallery;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`). Everything
/// here is constructed once at the composition root in `main` -- nothing
/// is lazily created from inside a handler.
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// ComfyUI generation orchestrator.
    pub generator: Arc<Generator>,
    /// Filesystem store for generated images.
    pub gallery: Gallery,
    /// Prompt-enhancement client. `None` until an API key is
    /// configured; `POST /config` can swap it at runtime, hence the
    /// lock.
    pub enhancer: Arc<RwLock<Option<OpenRouterClient>>>,
}
