mod accounts;
mod board;
mod config;
mod db;
mod errors;
mod flows;
mod llm_client;
mod models;
mod routes;
mod state;
mod store;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::db::create_store;
use crate::flows::definitions::builtin_registry;
use crate::flows::Flows;
use crate::llm_client::select_invoker;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting HireWise API v{}", env!("CARGO_PKG_VERSION"));

    // Flow registry is read-only from here on
    let registry = Arc::new(builtin_registry()?);
    info!("Registered flows: {}", registry.names().join(", "));

    // Model backend: live Gemini when a key is configured, mock otherwise
    let invoker = select_invoker(
        config.gemini_api_key.clone(),
        &config.gemini_base_url,
        config.mock_delay,
    )?;
    info!(
        "Model backend initialized (backend: {}, model: {})",
        invoker.backend(),
        llm_client::MODEL
    );

    let store = create_store(config.database_url.as_deref()).await?;
    info!("Document store initialized (backend: {})", store.backend());

    let state = AppState {
        flows: Flows::new(registry, invoker),
        store,
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins once the web client has a fixed domain

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
