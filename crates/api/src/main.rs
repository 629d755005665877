use std::net::SocketAddr;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fluxgen_api::config::ServerConfig;
use fluxgen_api::gallery::Gallery;
use fluxgen_api::router::build_app_router;
use fluxgen_api::state::AppState;
use fluxgen_comfyui::{Generator, GeneratorConfig};
use fluxgen_enhance::OpenRouterClient;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fluxgen=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Generation orchestrator ---
    let generator = Generator::new(GeneratorConfig {
        api_url: config.comfyui_url.clone(),
        ws_url: config.comfyui_ws_url.clone(),
        monitor_timeout: config.monitor_timeout,
    });
    if generator.check_reachable().await {
        tracing::info!(url = %config.comfyui_url, "ComfyUI engine is reachable");
    } else {
        tracing::warn!(
            url = %config.comfyui_url,
            "ComfyUI engine is not reachable; generation requests will fail until it is up"
        );
    }

    // --- Prompt enhancement ---
    let enhancer = if config.openrouter_api_key.is_empty() {
        tracing::info!("No OpenRouter API key configured; prompt enhancement disabled");
        None
    } else {
        Some(OpenRouterClient::new(config.openrouter_api_key.clone()))
    };

    // --- Gallery ---
    let gallery = Gallery::new(config.output_dir.clone());
    gallery
        .ensure_dir()
        .await
        .expect("Failed to create output directory");
    tracing::info!(dir = %gallery.dir().display(), "Output directory ready");

    // --- App state ---
    let state = AppState {
        config: Arc::new(config.clone()),
        generator: Arc::new(generator),
        gallery,
        enhancer: Arc::new(RwLock::new(enhancer)),
    };

    // --- Router ---
    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix) so the server
/// shuts down cleanly whether stopped interactively or by a process
/// manager (e.g. systemd, Docker, Kubernetes).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
