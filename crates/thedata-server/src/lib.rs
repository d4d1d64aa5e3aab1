pub mod broker;
pub mod config;
pub mod error;
pub mod routes;
pub mod service;
pub mod state;

use anyhow::Context;
use axum::routing::get;
use axum::Router;
use std::future::Future;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::service::ServiceContext;
use crate::state::AppState;

/// Build the axum Router with the liveness route and request tracing.
/// Used by `serve_on()` and available for integration testing.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(routes::health::health_check))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run the service on a pre-bound listener until Ctrl+C or SIGTERM.
pub async fn serve_on(
    listener: tokio::net::TcpListener,
    service: Arc<ServiceContext>,
) -> anyhow::Result<()> {
    serve_with_shutdown(listener, service, shutdown_signal()).await
}

/// Connect to the broker, serve until `signal` resolves, then release the
/// connection.
///
/// A failed connection is returned before any request is served.
pub async fn serve_with_shutdown<F>(
    listener: tokio::net::TcpListener,
    service: Arc<ServiceContext>,
    signal: F,
) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    service
        .startup()
        .await
        .context("failed to initialize NATS connection")?;

    let addr = listener.local_addr()?;
    tracing::info!("thedata liveness service listening on http://{addr}");

    let app = build_router(AppState::new(service.clone()));
    let result = axum::serve(listener, app)
        .with_graceful_shutdown(signal)
        .await;

    service.shutdown().await;
    result?;
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("received Ctrl+C");
        },
        _ = terminate => {
            tracing::info!("received SIGTERM");
        },
    }
}
