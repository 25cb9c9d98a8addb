//! slicer-server: the HTTP surface of audioslicer.
//!
//! Serves the embedded page and a small JSON API for uploading a file,
//! splitting it, following progress over SSE, and downloading the segments
//! one by one or as a ZIP.

pub mod context;
pub mod error;
pub mod router;
pub mod routes;

use std::net::SocketAddr;
use std::sync::Arc;

use slicer_av::FfmpegEngine;
use slicer_core::config::Config;

use crate::context::AppContext;

/// Start the server and block until a shutdown signal arrives.
///
/// The engine is created here but only loaded on the first split.
pub async fn start(config: Config) -> slicer_core::Result<()> {
    for warning in config.validate() {
        tracing::warn!("Config warning: {warning}");
    }

    let engine = Arc::new(FfmpegEngine::from_config(&config));
    let ctx = AppContext::new(config, engine);

    for info in ctx.tools.check_all() {
        if info.available {
            tracing::info!(
                "Tool found: {} ({})",
                info.name,
                info.version.as_deref().unwrap_or("unknown version")
            );
        } else {
            tracing::warn!("Tool not found: {}", info.name);
        }
    }

    let addr: SocketAddr = format!("{}:{}", ctx.config.server.host, ctx.config.server.port)
        .parse()
        .map_err(|e| slicer_core::Error::Internal(format!("Invalid server address: {e}")))?;

    let app = router::build_router(ctx.clone());

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| slicer_core::Error::Internal(format!("Failed to bind to {addr}: {e}")))?;
    tracing::info!("Listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| slicer_core::Error::Internal(format!("Server error: {e}")))?;

    // Revoke every outstanding content handle.
    ctx.pipeline.clear();
    tracing::info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    tracing::info!("Shutdown signal received");
}
