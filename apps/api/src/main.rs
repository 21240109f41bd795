mod config;
mod editor;
mod errors;
mod models;
mod normalizer;
mod routes;
mod state;
mod storage;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::editor::session::SWEEP_PERIOD;
use crate::editor::SessionRegistry;
use crate::routes::build_router;
use crate::state::AppState;
use crate::storage::http::HttpConnector;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting resume editor v{}", env!("CARGO_PKG_VERSION"));

    // Credential store client; each session binds it to the caller's token
    let connector = HttpConnector::new(&config.storage_url, config.storage_timeout)?;
    info!("Document store at {}", config.storage_url);

    // Drop sessions abandoned without a DELETE
    let sessions = SessionRegistry::new(config.session_idle_ttl);
    sessions.spawn_sweeper(SWEEP_PERIOD);

    let state = AppState {
        sessions,
        connector: Arc::new(connector),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins to the editor frontend host

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
