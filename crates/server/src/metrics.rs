//! Prometheus export of pipeline stage metrics.

use std::time::Duration;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use normalizer::{ErrorKind, EvaluationError, PipelineMetrics, PipelineOutcome};

pub const MAPPING_TOTAL: &str = "normalizer_mapping_total";
pub const MAPPING_SECONDS: &str = "normalizer_mapping_duration_seconds";
pub const VIOLATIONS_TOTAL: &str = "normalizer_validation_violations_total";
pub const VALIDATION_SECONDS: &str = "normalizer_validation_duration_seconds";
pub const OUTCOME_TOTAL: &str = "normalizer_outcome_total";
pub const PIPELINE_SECONDS: &str = "normalizer_pipeline_duration_seconds";

/// Install the process-wide Prometheus recorder.
///
/// Returns `None` if a recorder is already installed.
pub fn install_recorder() -> Option<PrometheusHandle> {
    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => Some(handle),
        Err(err) => {
            tracing::warn!(error = %err, "metrics recorder not installed");
            None
        }
    }
}

/// [`PipelineMetrics`] backed by the `metrics` facade.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrometheusMetrics;

impl PipelineMetrics for PrometheusMetrics {
    fn record_mapping(&self, provider: &str, latency: Duration, result: Result<(), EvaluationError>) {
        let result = match result {
            Ok(()) => "ok",
            Err(err) if err.is_timeout() => "timeout",
            Err(_) => "error",
        };
        counter!(MAPPING_TOTAL, "provider" => provider.to_string(), "result" => result).increment(1);
        histogram!(MAPPING_SECONDS, "provider" => provider.to_string()).record(latency.as_secs_f64());
    }

    fn record_validation(&self, provider: &str, latency: Duration, violations: usize) {
        counter!(VIOLATIONS_TOTAL, "provider" => provider.to_string()).increment(violations as u64);
        histogram!(VALIDATION_SECONDS, "provider" => provider.to_string())
            .record(latency.as_secs_f64());
    }

    fn record_outcome(&self, provider: &str, latency: Duration, outcome: &PipelineOutcome) {
        // Unregistered keys come straight from callers; keep them out of label values.
        let provider = match outcome.failure() {
            Some(failure) if failure.kind == ErrorKind::UnknownProvider => "unknown".to_string(),
            _ => provider.to_string(),
        };
        counter!(OUTCOME_TOTAL, "provider" => provider.clone(), "outcome" => outcome.label())
            .increment(1);
        histogram!(PIPELINE_SECONDS, "provider" => provider).record(latency.as_secs_f64());
    }
}
