//! HTTP Surface
//!
//! HTTP layer for wszero, built with Axum.
//!
//! # Endpoints
//!
//! ## WebSocket
//! - `GET /ws` - Event connection (503 when the hub is full)
//!
//! ## Health
//! - `GET /health/live` - Liveness probe
//! - `GET /health/ready` - Readiness probe
//! - `GET /health` - Full health status
//!
//! ## Assets
//! - Every other path is served from the configured assets directory,
//!   with `index.html` at `/` and the browser client at `/js/wszero.js`.
//!
//! # Example
//!
//! ```rust,ignore
//! use wszero::api::{serve, AppState};
//! use wszero::config::ServerConfig;
//! use wszero::dispatch::Dispatcher;
//! use wszero::websocket::{Hub, HubConfig};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let hub = Arc::new(Hub::new(HubConfig::default(), Dispatcher::new()));
//!     serve(AppState::new(hub, ServerConfig::default())).await?;
//!     Ok(())
//! }
//! ```

pub mod dto;
pub mod error;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use state::AppState;

use axum::{routing::get, Router};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::websocket::{websocket_handler, Hub};

/// Build the router with all routes and middleware
pub fn build_router(state: AppState) -> Router {
    let health_routes = Router::new()
        .route("/live", get(routes::health::liveness))
        .route("/ready", get(routes::health::readiness))
        .route("/", get(routes::health::full_health));

    let assets = ServeDir::new(&state.config.assets_dir);

    // Create shared state
    let shared_state = Arc::new(state);

    Router::new()
        .route("/ws", get(websocket_handler))
        .nest("/health", health_routes)
        .fallback_service(assets)
        .layer(TraceLayer::new_for_http())
        .with_state(shared_state)
}

/// Start the server and run until a shutdown signal arrives
pub async fn serve(state: AppState) -> Result<(), ApiError> {
    let addr = state.config.addr();
    let listener = TcpListener::bind(&addr).await?;

    tracing::info!("wszero listening on {}", addr);

    let hub = Arc::clone(&state.hub);
    serve_with_shutdown(state, listener, shutdown_signal(hub)).await
}

/// Serve on `listener` until `signal` resolves, then close every live
/// connection and wait up to the configured grace period for them to finish.
pub async fn serve_with_shutdown<F>(
    state: AppState,
    listener: TcpListener,
    signal: F,
) -> Result<(), ApiError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let hub = Arc::clone(&state.hub);
    let grace = Duration::from_secs(state.config.shutdown_grace_secs);
    let router = build_router(state);

    let shutdown_hub = Arc::clone(&hub);
    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        signal.await;
        shutdown_hub.shutdown();
    })
    .await?;

    // Upgraded sockets outlive the HTTP server; let them say goodbye
    hub.shutdown();
    if !hub.wait_idle(grace).await {
        tracing::warn!(
            connections = hub.connection_count(),
            "Grace period elapsed with connections still open"
        );
    }

    tracing::info!("wszero shut down gracefully");
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM
async fn shutdown_signal(hub: Arc<Hub>) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
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
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!(
        connections = hub.connection_count(),
        "Shutdown signal received, starting graceful shutdown"
    );
}
