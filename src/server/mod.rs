//! HTTP binding for the lesson pipeline.

mod router;
mod state;

pub use router::build_router;
pub use state::AppState;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::config::Config;
use crate::llm::OpenAiClient;

/// Bind and serve until Ctrl-C.
pub async fn serve(config: Config) -> anyhow::Result<()> {
    let addr: SocketAddr = config
        .bind
        .parse()
        .with_context(|| format!("invalid bind address '{}'", config.bind))?;

    if !config.has_api_key() {
        warn!("OPENAI_API_KEY is not set; lesson routes will answer 503");
    }

    let client = OpenAiClient::new(&config)?;
    let router = build_router(AppState::new(&config, Arc::new(client)));

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!(%addr, model = %config.model, "songplan listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server exited unexpectedly")?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(?err, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}
