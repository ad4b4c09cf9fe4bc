//! Loopback HTTP API for the desktop GUI and the browser extension.

mod handlers;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::{header, Method};
use axum::routing::{get, post};
use axum::Router;
use tokio::signal;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::config::Settings;
use crate::errors::{Result, VaultError};
use crate::gateway::AccessGateway;
use crate::session::VaultSession;

/// Shared handler state: the gateway, and through it the session.
#[derive(Debug, Clone)]
pub struct ApiState {
    gateway: AccessGateway,
}

impl ApiState {
    pub fn new(session: Arc<VaultSession>) -> Self {
        Self {
            gateway: AccessGateway::new(session),
        }
    }

    fn session(&self) -> Arc<VaultSession> {
        Arc::clone(self.gateway.session())
    }
}

/// Build the API router.
///
/// Route paths match what the browser extension calls.  CORS is open
/// because the extension's origin is not known ahead of time; the
/// listener itself only ever binds loopback.
pub fn router(state: ApiState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    Router::new()
        .route("/api/unlock", post(handlers::unlock))
        .route("/api/lock", post(handlers::lock))
        .route("/api/status", get(handlers::status))
        .route("/api/request-token", post(handlers::request_token))
        .route(
            "/api/get-all-passwords",
            get(handlers::all_records).post(handlers::all_records),
        )
        .route("/api/save-password", post(handlers::save_record))
        .route("/api/delete-password", post(handlers::delete_record))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve the API on `settings.bind_address:settings.port` until Ctrl+C or
/// SIGTERM.
pub async fn serve(settings: &Settings, session: Arc<VaultSession>) -> Result<()> {
    settings.validate()?;

    let address = SocketAddr::new(settings.bind_address, settings.port);
    let listener = tokio::net::TcpListener::bind(address)
        .await
        .map_err(|e| VaultError::ServerError(format!("cannot bind {address}: {e}")))?;

    info!(
        address = %address,
        status = session.status().as_str(),
        "Starting API server"
    );

    axum::serve(listener, router(ApiState::new(session)))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| VaultError::ServerError(format!("HTTP server failed: {e}")))?;

    info!("Server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {e}");
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
                error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown...");
}
