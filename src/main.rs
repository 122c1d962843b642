use anyhow::Context;
use seo_optimizer::config::{log_filter, Config};
use seo_optimizer::jobs::{InMemoryJobStore, Orchestrator};
use seo_optimizer::{create_app, AppState};
use std::net::SocketAddr;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(std::env::var("RUST_LOG").ok().as_deref()))
        .init();

    let config = Config::from_env();

    let store = Arc::new(InMemoryJobStore::new());
    let orchestrator = Orchestrator::from_config(&config, store).context("failed to build analysis pipeline")?;
    let app = create_app(AppState::new(orchestrator), &config);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    tracing::info!("Server running on http://{}", config.bind_addr);
    tracing::info!("API docs at http://{}/docs", config.bind_addr);

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;
    Ok(())
}
