//! kvcache - An in-memory key/value cache server
//!
//! Scalar, list and dict entries with per-entry TTL behind a Basic-auth
//! HTTP API, plus background sweeping and periodic snapshots.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use kvcache::api::{create_router, AppState};
use kvcache::config::{load_accounts, Args};
use kvcache::store::{FileSnapshotter, Store, SystemClock};

/// Main entry point for the kvcache server.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Parse command-line arguments
/// 3. Load the Basic-auth accounts file
/// 4. Construct the store, rehydrating from the snapshot file if present
/// 5. Start the background sweep and dump jobs
/// 6. Start the HTTP server on the configured port
/// 7. Handle graceful shutdown on SIGINT/SIGTERM
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing subscriber with env filter
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "kvcache=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("starting kvcache server");

    let args = Args::parse();
    info!(
        "configuration: accounts={:?}, cleaning_period={:?}, dumping_period={:?}, dump={:?}, port={}",
        args.accounts_path, args.cleaning_period, args.dumping_period, args.dump_path, args.port
    );

    let accounts = load_accounts(&args.accounts_path).context("failed to load accounts")?;
    if accounts.is_empty() {
        warn!("accounts file has no entries, every request will be rejected");
    }

    let store = Store::new(
        args.params(),
        Arc::new(SystemClock),
        Arc::new(FileSnapshotter::new(&args.dump_path)),
    )
    .context("failed to construct store")?;
    let store = Arc::new(store);

    store
        .start_sweep()
        .await
        .context("failed to start sweep job")?;
    store
        .start_dump()
        .await
        .context("failed to start dump job")?;
    info!("background jobs started");

    let app = create_router(AppState::new(Arc::clone(&store)), Arc::new(accounts));

    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("server listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    if let Err(e) = store.stop_sweep().await {
        warn!(error = %e, "sweep job did not stop cleanly");
    }
    if let Err(e) = store.stop_dump().await {
        warn!(error = %e, "dump job did not stop cleanly");
    }
    info!("server shutdown complete");
    Ok(())
}

/// Waits for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("received Ctrl+C, initiating shutdown");
        }
        _ = terminate => {
            info!("received SIGTERM, initiating shutdown");
        }
    }
}
