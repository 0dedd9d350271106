mod candidates;
mod config;
mod db;
mod errors;
mod extract;
mod jobs;
mod llm_client;
mod routes;
mod state;
#[cfg(test)]
mod test_support;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::db::open_candidate_store;
use crate::extract::DocumentExtractor;
use crate::jobs::runner::JobRunner;
use crate::jobs::session::{spawn_sweeper, SessionTable};
use crate::llm_client::LlmClient;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting resume ranker v{}", env!("CARGO_PKG_VERSION"));

    let store = open_candidate_store(config.database_url.as_deref()).await?;

    let llm = LlmClient::new(config.anthropic_api_key.clone())?;
    info!("LLM client initialized (model: {})", llm_client::MODEL);

    // Session table lives for the whole process; handlers and the runner share it.
    let sessions = SessionTable::new();
    let runner = JobRunner::new(
        sessions.clone(),
        Arc::new(DocumentExtractor),
        Arc::new(llm),
        store.clone(),
        config.max_concurrent_jobs,
    );
    info!(
        "Job runner ready (max {} concurrent jobs)",
        config.max_concurrent_jobs
    );

    let sweeper = config.sweep_interval.map(|interval| {
        info!("Sweeping expired sessions every {}s", interval.as_secs());
        spawn_sweeper(sessions.clone(), interval, config.session_expiry)
    });

    let state = AppState {
        sessions,
        runner,
        store,
        config: config.clone(),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(sweeper) = sweeper {
        sweeper.abort();
    }
    info!("Shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
