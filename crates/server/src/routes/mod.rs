//! API route handlers
//!
//! - `health`: liveness, readiness and Prometheus metrics
//! - `webhook`: webhook intake and the provider listing

pub mod health;
pub mod webhook;

use crate::error::{ServerError, ServerResult};
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

/// API version and base info (GET /)
///
/// ```json
/// {
///   "name": "Dispute Normalizer",
///   "version": "0.1.0",
///   "api_version": "v1",
///   "endpoints": ["..."]
/// }
/// ```
pub async fn api_info() -> ServerResult<impl IntoResponse> {
    Ok(Json(json!({
        "name": "Dispute Normalizer",
        "version": env!("CARGO_PKG_VERSION"),
        "api_version": "v1",
        "endpoints": [
            "/webhooks",
            "/webhooks/{provider}",
            "/api/v1/providers",
            "/health",
            "/ready",
            "/metrics"
        ]
    })))
}

/// 404 Not Found handler
pub async fn not_found() -> ServerError {
    ServerError::NotFound
}
