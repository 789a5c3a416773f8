//! Server initialization and routing
//!
//! Router construction, the middleware stack and graceful shutdown.

use crate::config::ServerConfig;
use crate::middleware::{log_requests, request_id};
use crate::routes::{api_info, health, not_found, webhook};
use crate::state::ServerState;
use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use axum::middleware::from_fn;
use axum::routing::{get, post};
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

/// Build the Axum router with all routes and middleware
///
/// Middleware stack (outermost last):
/// 1. Body size limit
/// 2. Timeout handling
/// 3. Compression
/// 4. CORS
/// 5. Request ID tracking
/// 6. Request logging
/// 7. HTTP tracing
pub fn build_router(state: Arc<ServerState>) -> Router {
    let cors = if state.config.enable_cors {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        CorsLayer::new()
    };

    let public_routes = Router::new()
        .route("/", get(api_info))
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        .route("/metrics", get(health::metrics));

    let webhook_routes = Router::new()
        .route("/webhooks", post(webhook::receive_detected))
        .route("/webhooks/{provider}", post(webhook::receive_for_provider))
        .route("/api/v1/providers", get(webhook::list_providers));

    Router::new()
        .merge(public_routes)
        .merge(webhook_routes)
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(state.config.max_body_size()))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            state.config.timeout(),
        ))
        .layer(CompressionLayer::new())
        .layer(cors)
        .layer(from_fn(request_id))
        .layer(from_fn(log_requests))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Install the global tracing subscriber.
pub fn init_tracing(config: &ServerConfig) {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(&config.log_level)
        .with_target(false);

    if config.json_logs() {
        builder
            .with_thread_ids(true)
            .with_thread_names(true)
            .json()
            .init();
    } else {
        builder.pretty().init();
    }
}

/// Start the webhook server
///
/// Loads every provider mapping, binds the configured address and serves
/// until SIGTERM or Ctrl+C.
///
/// ```rust,no_run
/// use server::ServerConfig;
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let config = ServerConfig::load()?;
///     server::start_server(config).await?;
///     Ok(())
/// }
/// ```
///
/// Fails before binding if the mapping directory is missing or any mapping
/// does not compile.
pub async fn start_server(config: ServerConfig) -> anyhow::Result<()> {
    init_tracing(&config);

    let state = Arc::new(ServerState::new(config.clone())?);
    let providers: Vec<String> = state
        .pipeline
        .registry()
        .keys()
        .into_iter()
        .map(ToString::to_string)
        .collect();

    let app = build_router(state);

    let addr: SocketAddr = config.socket_addr()?;

    tracing::info!(
        "Starting dispute server on {} with providers [{}]",
        addr,
        providers.join(", ")
    );
    tracing::info!(
        "Timeout: {}s, Max body: {}MB, Evaluation budget: {}ms",
        config.timeout_secs,
        config.max_body_size_mb,
        config.pipeline.evaluation.timeout_ms
    );
    tracing::info!(
        "CORS: {}, Metrics: {}",
        config.enable_cors,
        config.metrics_enabled
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Shutdown signal handler
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to install Ctrl+C handler");
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
                tracing::error!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C, shutting down..."),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down..."),
    }
}
