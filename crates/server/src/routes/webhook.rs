//! Webhook intake.
//!
//! Both endpoints parse the raw body as JSON, pick a provider and hand the
//! payload to the shared pipeline on the blocking pool. The outcome maps
//! onto the response as:
//!
//! | outcome     | status | body                                          |
//! |-------------|--------|-----------------------------------------------|
//! | `Succeeded` | 200    | `{"result": <record>}`                        |
//! | `Rejected`  | 400    | `{"errors": [{"instancePath", "message"}]}`   |
//! | `Failed`    | 500    | `{"error": <message>}`                        |

use crate::detect::detect_provider;
use crate::error::{ServerError, ServerResult};
use crate::state::ServerState;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use normalizer::PipelineOutcome;
use serde_json::{json, Value};
use std::sync::Arc;

/// `POST /webhooks/{provider}`
pub async fn receive_for_provider(
    State(state): State<Arc<ServerState>>,
    Path(provider): Path<String>,
    body: Bytes,
) -> ServerResult<Response> {
    let payload = parse_payload(&body)?;
    let outcome = run_pipeline(&state, provider, payload).await?;
    Ok(outcome_response(outcome))
}

/// `POST /webhooks`, provider inferred from headers or payload shape.
pub async fn receive_detected(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
    body: Bytes,
) -> ServerResult<Response> {
    let payload = parse_payload(&body)?;
    let provider = detect_provider(&headers, &payload).ok_or(ServerError::UndetectableProvider)?;
    tracing::debug!(provider = %provider, "provider detected");

    let outcome = run_pipeline(&state, provider, payload).await?;
    Ok(outcome_response(outcome))
}

/// `GET /api/v1/providers`
pub async fn list_providers(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    let providers: Vec<String> = state
        .pipeline
        .registry()
        .keys()
        .into_iter()
        .map(ToString::to_string)
        .collect();

    Json(json!({
        "count": providers.len(),
        "providers": providers,
    }))
}

fn parse_payload(body: &[u8]) -> ServerResult<Value> {
    Ok(serde_json::from_slice(body)?)
}

async fn run_pipeline(
    state: &ServerState,
    provider: String,
    payload: Value,
) -> ServerResult<PipelineOutcome> {
    let pipeline = state.pipeline.clone();
    let outcome = tokio::task::spawn_blocking(move || {
        let outcome = pipeline.process(&provider, &payload);
        tracing::info!(provider = %provider, outcome = outcome.label(), "webhook processed");
        outcome
    })
    .await
    .map_err(|e| ServerError::Internal(format!("pipeline task failed: {e}")))?;

    Ok(outcome)
}

/// Render a pipeline outcome as an HTTP response.
pub fn outcome_response(outcome: PipelineOutcome) -> Response {
    match outcome {
        PipelineOutcome::Succeeded(record) => {
            (StatusCode::OK, Json(json!({ "result": record }))).into_response()
        }
        PipelineOutcome::Rejected(violations) => {
            (StatusCode::BAD_REQUEST, Json(json!({ "errors": violations }))).into_response()
        }
        PipelineOutcome::Failed(failure) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": failure.message })),
        )
            .into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use normalizer::{PipelineFailure, Violation};

    #[test]
    fn outcome_status_codes() {
        let rejected = outcome_response(PipelineOutcome::Rejected(vec![Violation::new(
            "/amount",
            "must be number",
        )]));
        assert_eq!(rejected.status(), StatusCode::BAD_REQUEST);

        let failed = outcome_response(PipelineOutcome::Failed(PipelineFailure::timeout()));
        assert_eq!(failed.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn invalid_json_is_bad_request() {
        let err = parse_payload(b"{not json").unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }
}
