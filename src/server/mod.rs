// file: src/server/mod.rs
// description: axum web interface for asking market questions
// reference: router setup, middleware stack and graceful shutdown

pub mod auth;
pub mod error;
pub mod routes;
pub mod state;
pub mod views;

pub use error::{ServerError, ServerResult};
pub use state::{AppState, FilterOptions};

use crate::config::ServerConfig;
use crate::error::{PipelineError, Result};
use axum::Router;
use axum::http::StatusCode;
use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::{get, post};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower::limit::GlobalConcurrencyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// `/health` is public. Everything else sits behind Basic auth, and the two
/// query routes draw permits from the semaphore held in the state.
pub fn build_router(state: Arc<AppState>) -> Router {
    let query_routes = Router::new()
        .route("/ask", post(routes::ask))
        .route("/api/query", post(routes::api_query))
        .layer(GlobalConcurrencyLimitLayer::with_semaphore(
            state.query_permits.clone(),
        ));

    let protected_routes = Router::new()
        .route("/", get(routes::index))
        .merge(query_routes)
        .layer(from_fn_with_state(state.clone(), auth::basic_auth));

    Router::new()
        .route("/health", get(routes::health))
        .merge(protected_routes)
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(state.config.timeout_secs),
        ))
        .layer(from_fn(auth::request_id))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub fn ensure_password(config: &ServerConfig) -> Result<()> {
    match config.password.as_deref() {
        Some(password) if !password.is_empty() => Ok(()),
        _ => Err(PipelineError::Config(
            "server.password is not set; set MARKET_INTEL__SERVER__PASSWORD before serving"
                .to_string(),
        )),
    }
}

pub async fn serve(state: Arc<AppState>) -> Result<()> {
    ensure_password(&state.config)?;

    let addr: SocketAddr = state
        .config
        .bind_address()
        .parse()
        .map_err(|e| PipelineError::Config(format!("invalid bind address: {}", e)))?;

    info!(
        "Serving market intelligence UI on http://{} ({} chunks, model {})",
        addr,
        state.agent.index().len(),
        state.agent.model()
    );
    info!(
        "Timeout: {}s, max concurrent queries: {}",
        state.config.timeout_secs, state.config.max_concurrent_queries
    );

    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
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
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
        _ = terminate => info!("Received SIGTERM, shutting down..."),
    }
}
