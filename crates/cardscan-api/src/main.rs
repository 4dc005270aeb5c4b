//! HTTP API for card scans and vehicles.
//!
//! This server:
//! - Keeps a scan log and a vehicle registry as JSON files in a GitHub repository
//! - Reads the current file on every request and writes it back with its revision
//! - Serves permissive CORS so browser clients on any origin can call it

use std::sync::Arc;

use cardscan_github::GitHubContentsClient;
use cardscan_store::{BlobStore, DocumentStore, MemoryBlobStore, RecordStore};
use clap::Parser;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod config;
mod error;
mod handlers;
mod router;

use config::{Backend, Config};
use handlers::AppState;
use router::build_router;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::parse();

    info!("Starting cardscan-api v{}", env!("CARGO_PKG_VERSION"));
    info!("  Host: {}", config.host);
    info!("  Port: {}", config.port);

    let status = config.store_status();
    let backend: Arc<dyn BlobStore> = match config.backend {
        Backend::Github => {
            let github = config.github();
            info!("  Backend: github ({})", github.repo_slug());
            info!("  Branch: {}", github.branch);

            if !github.has_token() {
                warn!("  Writes: DISABLED (GITHUB_TOKEN not set)");
            } else if github.repository().is_none() {
                warn!("  Writes: DISABLED (set GITHUB_OWNER and GITHUB_REPO)");
            } else {
                info!("  Writes: enabled");
            }

            Arc::new(GitHubContentsClient::new(github)?)
        }
        Backend::Memory => {
            warn!("  Backend: memory (data is lost on exit)");
            Arc::new(MemoryBlobStore::new())
        }
    };

    let state = AppState {
        records: RecordStore::new(DocumentStore::new(backend)),
        store_configured: status.configured,
        repo: status.repo,
    };

    let app = build_router(state);

    // Bind and serve
    let addr = format!("{}:{}", config.host, config.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM. A listener that cannot be installed is
/// logged and never fires.
async fn shutdown_signal() {
    let interrupt = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Cannot listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Cannot listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let received = tokio::select! {
        _ = interrupt => "Ctrl+C",
        _ = terminate => "SIGTERM",
    };
    info!("Received {}, draining connections", received);
}
