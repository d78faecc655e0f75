//! Cache Chain server
//!
//! Serves hotel and user CRUD through the cache chain, plus search over the
//! event-fed index.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Context;
use tokio::signal;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cache_chain::api::create_router;
use cache_chain::models::{Hotel, User};
use cache_chain::{build_entity, spawn_lease_task, AppState, Backends, Config, WorkerHandles};

/// Time allowed for pending change events to reach the queue after shutdown.
const PUBLISH_FLUSH_TIMEOUT: Duration = Duration::from_secs(5);

/// Main entry point for the Cache Chain server.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Connect shared backends (Redis, or in-process stand-ins)
///    and claim the single-instance lease on a shared Redis
/// 4. Build the hotel and user chains, indexes and workers
/// 5. Start publisher, consumer and TTL cleanup tasks
/// 6. Serve HTTP until SIGINT/SIGTERM
/// 7. Stop workers and flush pending events
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cache_chain=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Cache Chain server");

    let config = Config::from_env();
    info!(
        "Configuration loaded: l1_max_entries={}, l1_ttl={}s, l2_ttl={}s, port={}, payload={:?}",
        config.l1_max_entries, config.l1_ttl, config.l2_ttl, config.server_port, config.event_payload
    );

    let backends = Backends::connect(&config)
        .await
        .context("failed to connect backends")?;
    let lease = backends
        .acquire_lease(&config)
        .await
        .context("another instance is attached to this Redis")?;
    let (hotels, hotel_workers) = build_entity::<Hotel>(&config, &backends, &config.hotels_queue)
        .await
        .context("failed to build hotel services")?;
    let (users, user_workers) = build_entity::<User>(&config, &backends, &config.users_queue)
        .await
        .context("failed to build user services")?;

    let shutdown = CancellationToken::new();
    let lease_handle = lease.map(|lease| spawn_lease_task(lease, shutdown.clone()));
    let hotel_handles = hotel_workers.spawn(&shutdown);
    let user_handles = user_workers.spawn(&shutdown);
    info!("Background workers started");

    let app = create_router(AppState::new(hotels, users, &config));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Server listening on http://{}", addr);

    // The router owns the last publisher handles; dropping it lets the publishers drain
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
        .await
        .context("server error")?;

    shutdown.cancel();
    stop_workers("hotels", hotel_handles).await;
    stop_workers("users", user_handles).await;
    if let Some(handle) = lease_handle {
        join_quietly("lease", handle).await;
    }

    info!("Server shutdown complete");
    Ok(())
}

async fn stop_workers(name: &str, handles: WorkerHandles) {
    match tokio::time::timeout(PUBLISH_FLUSH_TIMEOUT, handles.publisher).await {
        Ok(_) => info!(entity = name, "Pending events flushed"),
        Err(_) => warn!(entity = name, "Timed out flushing pending events"),
    }
    join_quietly(name, handles.consumer).await;
    join_quietly(name, handles.cleanup).await;
}

async fn join_quietly(name: &str, handle: JoinHandle<()>) {
    if let Err(err) = handle.await {
        warn!(entity = name, error = %err, "Worker ended abnormally");
    }
}

/// Waits for shutdown signal (Ctrl+C, SIGTERM or a lost instance lease).
///
/// In-flight requests finish before workers are stopped.
async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!(error = %err, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "Failed to install SIGTERM handler");
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
        _ = shutdown.cancelled() => {
            info!("Shutdown requested internally, initiating shutdown...");
        }
    }
}
