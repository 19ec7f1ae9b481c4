use std::sync::Arc;

use anyhow::Context;
use probmark_server::api::{AppState, create_router};
use probmark_server::config::ServerConfig;
use probmark_server::db::connect_and_migrate;
use probmark_server::search::{SearchClient, build_backend};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing()?;

    info!("starting probmark server");
    let config = ServerConfig::load().context("failed to load server config")?;

    let db = connect_and_migrate(&config.database_url).await?;
    let backend = build_backend(&config.search)?;
    let search_client = SearchClient::new(backend, &config.search);
    let state = Arc::new(AppState::new(db, search_client, &config));

    if config.search.reindex_on_startup {
        match state
            .index_sync
            .reindex_problems(state.problems.as_ref(), config.search.reindex_batch_size)
            .await
        {
            Ok(report) => info!(
                indexed = report.indexed,
                failed = report.failed,
                "startup reindex finished"
            ),
            Err(err) => warn!(error = %err, "startup reindex failed"),
        }
    }

    let listener = tokio::net::TcpListener::bind(&config.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.bind))?;
    info!(bind = %config.bind, "server is ready, press Ctrl+C to shut down");

    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for shutdown signal");
    }
    info!("shutdown signal received, stopping server");
}

fn init_tracing() -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("info"))?;

    tracing_subscriber::fmt().with_env_filter(env_filter).init();
    Ok(())
}
