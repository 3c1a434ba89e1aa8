mod catalog;
mod config;
mod error;
mod gemini;
mod models;
mod pipeline;
mod prompt;
mod resolve;
mod routes;
mod sanitize;

use anyhow::Context;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{fmt, EnvFilter};

use crate::catalog::OptionCatalogs;
use crate::config::Config;
use crate::gemini::GeminiClient;
use crate::pipeline::Pipeline;
use crate::routes::{build_router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    // Init tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    let config = Config::from_env().context("refusing to start without a valid configuration")?;
    tracing::info!(
        text_model = %config.text_model,
        image_model = %config.image_model,
        "Using Gemini at {}",
        config.api_base
    );

    let shutdown = CancellationToken::new();
    let gateway = Arc::new(GeminiClient::new(&config, shutdown.clone()));
    let state = AppState {
        pipeline: Arc::new(Pipeline::new(gateway, OptionCatalogs::STANDARD)),
    };
    let app = build_router(state, config.max_upload_bytes);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("could not bind {addr}"))?;
    tracing::info!(%addr, "Starting server");

    axum::serve(listener, app)
        .with_graceful_shutdown(wait_for_shutdown(shutdown))
        .await
        .context("server error")?;
    Ok(())
}

async fn wait_for_shutdown(shutdown: CancellationToken) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested, abandoning in-flight model calls");
    shutdown.cancel();
}
