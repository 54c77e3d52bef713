use std::net::SocketAddr;

use anyhow::Context;
use catalog_service::{router, AppState};
use suite_query::prelude::{init_tracing, shutdown_tracing, Config};
use tokio::{net::TcpListener, signal};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load_for_service("catalog-service")?;
    init_tracing(&config)?;

    let shutdown = CancellationToken::new();
    let app = router(AppState::seeded(&config.pagination, shutdown.clone()));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.service.port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    tracing::info!("Starting {} on {}", config.service.name, addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await?;

    tracing::info!("Server shutdown complete");
    shutdown_tracing();

    Ok(())
}

/// Wait for SIGINT or SIGTERM, then cancel in-flight queries
async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl+C), starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        },
    }

    shutdown.cancel();
}
