//! Request Shield - in-process protection for expensive endpoints
//!
//! Serves the cache and rate limiter diagnostics/admin API.

use std::net::SocketAddr;

use anyhow::Context;
use tokio::signal;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use request_shield::api::create_router;
use request_shield::{AppState, Config};

/// Main entry point for the request shield server.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Create the cache and the rate limiter (which starts its own sweep)
/// 4. Start the background cache sweep
/// 5. Create Axum router with all endpoints
/// 6. Start HTTP server on configured port
/// 7. Handle graceful shutdown on SIGINT/SIGTERM
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "request_shield=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting request shield");

    let config = Config::from_env();
    info!(
        "Configuration loaded: cache_max_entries={}, cache_default_ttl={}ms, port={}, cache_cleanup_interval={}s, rate_limit_cleanup_interval={}s",
        config.cache_max_entries,
        config.cache_default_ttl_ms,
        config.server_port,
        config.cache_cleanup_interval,
        config.rate_limit_cleanup_interval
    );

    let state = AppState::from_config(&config);
    let cache_sweep = state.cache.spawn_cleanup(config.cache_cleanup_interval());
    info!("Cache and rate limiter initialized");

    let app = create_router(state.clone());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    shutdown(state, cache_sweep);
    info!("Server shutdown complete");
    Ok(())
}

/// Stops the background sweeps and drops limiter state.
fn shutdown(state: AppState, cache_sweep: JoinHandle<()>) {
    cache_sweep.abort();
    state.limiter.destroy();
    warn!("Cleanup tasks stopped");
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                warn!("Failed to install SIGTERM handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }
}
