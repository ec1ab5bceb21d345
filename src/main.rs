use std::net::SocketAddr;
use std::sync::Arc;

use bulk_extractor::config::{Cli, Config};
use bulk_extractor::fetch::HttpFetcher;
use bulk_extractor::routes;
use bulk_extractor::state::AppState;
use clap::Parser;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Parse CLI args and load config
    let cli = Cli::parse();
    tracing::info!("Data directory: {}", Config::data_dir(&cli).display());
    let config = Config::load(&cli)?;

    let fetcher = HttpFetcher::new(&config.api.base_url, config.api.request_timeout())?;
    tracing::info!("Extraction endpoint: {}", fetcher.endpoint());
    tracing::info!(
        "Session results are {}",
        if config.session.retain_results {
            "kept across batches"
        } else {
            "reset for every batch"
        }
    );

    let state = AppState::new(config.clone(), Arc::new(fetcher));
    let app = routes::router(state).layer(TraceLayer::new_for_http());

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    tracing::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
