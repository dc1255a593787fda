//! wayback-gateway server entry point.
//!
//! Serves archived snapshots over plain HTTP. Logging goes to stderr as JSON,
//! filtered by `RUST_LOG` (default `info`).

use std::net::SocketAddr;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;
use waygate_core::GatewayConfig;

mod error;
mod handler;
mod outcome;
mod page;
mod preferences;
mod rate_limit;
mod responder;
mod state;
mod target;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = GatewayConfig::load().context("loading configuration")?;
    let addr = config.listen_addr()?;
    let state = state::AppState::from_config(&config)?;

    let listener = tokio::net::TcpListener::bind(addr).await.with_context(|| format!("binding {addr}"))?;
    tracing::info!(%addr, "wayback-gateway is listening");

    let app = handler::router(state).into_make_service_with_connect_info::<SocketAddr>();
    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    tracing::info!("wayback-gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
