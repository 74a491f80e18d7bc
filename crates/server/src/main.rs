//! hearth server entry point.
//!
//! Loads configuration, boots the cache orchestrator (install, then activate)
//! and serves the MCP tools on stdio transport.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use hearth_core::AppConfig;
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use tracing_subscriber::EnvFilter;

mod handler;
mod state;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    tracing::info!(
        origin = %config.origin,
        version = %config.cache_version,
        db = %config.db_path.display(),
        "Starting hearth server on stdio transport"
    );

    let state = Arc::new(state::AppState::from_config(&config).await?);

    // A failed install leaves the worker redundant; requests pass straight through.
    match state.orchestrator.start().await {
        Ok(report) => tracing::info!(
            core = report.install.core,
            assets = report.install.assets,
            activated = report.activation.is_some(),
            "orchestrator started"
        ),
        Err(e) => tracing::error!(error = %e, "orchestrator failed to start; serving passthrough only"),
    }

    let handler = handler::HearthServer::new(state);
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;

    Ok(())
}
