mod app;
mod config;
mod error;
mod health;
mod shutdown;

use anyhow::Result;
use std::time::Instant;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::app::{build_router, verify_build_output};
use crate::config::ServerConfig;
use crate::shutdown::shutdown_signal;

#[tokio::main]
async fn main() -> Result<()> {
    let started = Instant::now();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenv::dotenv().ok();
    let config = ServerConfig::from_env()?;

    tracing::info!("Starting settlement dashboard server");

    let index = match verify_build_output(&config.dist_dir) {
        Ok(index) => index,
        Err(e) => {
            tracing::error!("{}", e);
            eprintln!("Error: {}", e);
            eprintln!("Build the frontend first, or point DIST_DIR at its output.");
            std::process::exit(1);
        }
    };
    tracing::info!("Serving frontend from {}", config.dist_dir.display());

    let app = build_router(&config.dist_dir, &index, started);

    let listener = tokio::net::TcpListener::bind(config.addr()).await?;
    tracing::info!("Server listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shut down gracefully");
    Ok(())
}
