use std::path::PathBuf;
use std::time::Duration;

use fluxgen_comfyui::generator::DEFAULT_MONITOR_TIMEOUT;

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `8000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `900` -- generation
    /// requests block for the full job duration).
    pub request_timeout_secs: u64,
    /// ComfyUI HTTP base URL.
    pub comfyui_url: String,
    /// ComfyUI WebSocket base URL. Defaults to `comfyui_url` with the
    /// scheme swapped to `ws`.
    pub comfyui_ws_url: String,
    /// Bound on the per-job event-stream wait.
    pub monitor_timeout: Duration,
    /// Directory where generated images and metadata sidecars land.
    pub output_dir: PathBuf,
    /// OpenRouter API key; empty means prompt enhancement is disabled.
    pub openrouter_api_key: String,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                    |
    /// |------------------------|----------------------------|
    /// | `HOST`                 | `0.0.0.0`                  |
    /// | `PORT`                 | `8000`                     |
    /// | `CORS_ORIGINS`         | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS` | `900`                      |
    /// | `COMFYUI_URL`          | `http://127.0.0.1:8188`    |
    /// | `COMFYUI_WS_URL`       | derived from `COMFYUI_URL` |
    /// | `MONITOR_TIMEOUT_SECS` | `600`                      |
    /// | `OUTPUT_DIR`           | `outputs`                  |
    /// | `OPENROUTER_API_KEY`   | (empty)                    |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "8000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "900".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let comfyui_url =
            std::env::var("COMFYUI_URL").unwrap_or_else(|_| "http://127.0.0.1:8188".into());

        let comfyui_ws_url =
            std::env::var("COMFYUI_WS_URL").unwrap_or_else(|_| derive_ws_url(&comfyui_url));

        let monitor_timeout = std::env::var("MONITOR_TIMEOUT_SECS")
            .ok()
            .map(|v| {
                Duration::from_secs(v.parse().expect("MONITOR_TIMEOUT_SECS must be a valid u64"))
            })
            .unwrap_or(DEFAULT_MONITOR_TIMEOUT);

        let output_dir = PathBuf::from(std::env::var("OUTPUT_DIR").unwrap_or_else(|_| "outputs".into()));

        let openrouter_api_key = std::env::var("OPENROUTER_API_KEY").unwrap_or_default();

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            comfyui_url,
            comfyui_ws_url,
            monitor_timeout,
            output_dir,
            openrouter_api_key,
        }
    }
}

/// Swap an HTTP base URL's scheme for the matching WebSocket scheme.
fn derive_ws_url(http_url: &str) -> String {
    if let Some(rest) = http_url.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = http_url.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        format!("ws://{http_url}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ws_url_derivation_swaps_scheme() {
        assert_eq!(derive_ws_url("http://127.0.0.1:8188"), "ws://127.0.0.1:8188");
        assert_eq!(derive_ws_url("https://gpu.example.com"), "wss://gpu.example.com");
        assert_eq!(derive_ws_url("gpu:8188"), "ws://gpu:8188");
    }
}
