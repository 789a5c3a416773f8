use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

pub type ServerResult<T> = Result<T, ServerError>;

/// Transport-level failures.
///
/// Pipeline outcomes are not errors here; they are rendered by the webhook
/// handlers. These cover what happens before or around a pipeline run.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Invalid JSON payload: {0}")]
    InvalidJson(String),

    #[error("Unable to detect provider; set the X-Webhook-Provider header or use /webhooks/{{provider}}")]
    UndetectableProvider,

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] normalizer::PipelineError),

    #[error("Metrics are disabled")]
    MetricsDisabled,

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Not found")]
    NotFound,
}

impl ServerError {
    /// Get HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServerError::InvalidJson(_) | ServerError::UndetectableProvider => {
                StatusCode::BAD_REQUEST
            }
            ServerError::NotFound | ServerError::MetricsDisabled => StatusCode::NOT_FOUND,
            ServerError::Pipeline(_) | ServerError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Get error code string
    pub fn error_code(&self) -> &'static str {
        match self {
            ServerError::InvalidJson(_) => "INVALID_JSON",
            ServerError::UndetectableProvider => "UNDETECTABLE_PROVIDER",
            ServerError::Pipeline(_) => "PIPELINE_ERROR",
            ServerError::MetricsDisabled => "METRICS_DISABLED",
            ServerError::Internal(_) => "INTERNAL_ERROR",
            ServerError::NotFound => "NOT_FOUND",
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(code = self.error_code(), error = %self, "request failed");
        }

        // `error` stays a plain string so every failure body shares the
        // `{"error": <message>}` shape of failed pipeline runs.
        let body = Json(json!({
            "error": self.to_string(),
            "code": self.error_code(),
        }));

        (status, body).into_response()
    }
}

impl From<serde_json::Error> for ServerError {
    fn from(err: serde_json::Error) -> Self {
        ServerError::InvalidJson(err.to_string())
    }
}
