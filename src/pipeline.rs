//! The transform-and-validate orchestrator.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use mapping::{EvalConfig, EvaluationError};
use registry::ProviderRegistry;
use schema::{Schema, SchemaValidator, ValidationResult, Violation};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::PipelineError;
use crate::config::PipelineConfig;
use crate::outcome::{NormalizedRecord, PipelineFailure, PipelineOutcome};

/// Metrics observer for pipeline stages.
///
/// Injected per pipeline with [`Pipeline::with_metrics`]; there is no
/// process-wide recorder.
pub trait PipelineMetrics: Send + Sync {
    fn record_mapping(&self, provider: &str, latency: Duration, result: Result<(), EvaluationError>);
    fn record_validation(&self, provider: &str, latency: Duration, violations: usize);
    fn record_outcome(&self, provider: &str, latency: Duration, outcome: &PipelineOutcome);
}

struct MetricsSpan<'a> {
    recorder: &'a dyn PipelineMetrics,
    start: Instant,
}

impl<'a> MetricsSpan<'a> {
    fn start(recorder: Option<&'a Arc<dyn PipelineMetrics>>) -> Option<Self> {
        recorder.map(|recorder| Self {
            recorder: recorder.as_ref(),
            start: Instant::now(),
        })
    }

    fn record_mapping(self, provider: &str, result: Result<(), EvaluationError>) {
        self.recorder
            .record_mapping(provider, self.start.elapsed(), result);
    }

    fn record_validation(self, provider: &str, violations: usize) {
        self.recorder
            .record_validation(provider, self.start.elapsed(), violations);
    }

    fn record_outcome(self, provider: &str, outcome: &PipelineOutcome) {
        self.recorder
            .record_outcome(provider, self.start.elapsed(), outcome);
    }
}

/// Runs provider mapping then schema validation for one payload at a time.
///
/// A pipeline holds only immutable, shared state: the frozen provider
/// registry, the compiled schema and the evaluation limits. Clones are
/// cheap and any number of threads may call [`Pipeline::process`]
/// concurrently.
#[derive(Clone)]
pub struct Pipeline {
    registry: ProviderRegistry,
    validator: SchemaValidator,
    eval_config: EvalConfig,
    metrics: Option<Arc<dyn PipelineMetrics>>,
}

impl Pipeline {
    pub fn new(registry: ProviderRegistry, validator: SchemaValidator, eval_config: EvalConfig) -> Self {
        Self {
            registry,
            validator,
            eval_config,
            metrics: None,
        }
    }

    /// Loads every mapping under `mappings_dir` and the configured schema.
    ///
    /// Either the whole registry loads or construction fails; a pipeline
    /// never starts with a partial provider set.
    pub fn from_config(cfg: &PipelineConfig) -> Result<Self, PipelineError> {
        cfg.validate()
            .map_err(|e| PipelineError::InvalidConfig(e.to_string()))?;

        let registry = registry::load_dir(&cfg.mappings_dir, &cfg.mapping_extension)?;
        let schema = match &cfg.schema_path {
            Some(path) => Schema::from_file(path)?,
            None => Schema::normalized_record(),
        };

        info!(
            providers = registry.len(),
            timeout_ms = cfg.evaluation.timeout_ms,
            custom_schema = cfg.schema_path.is_some(),
            "pipeline initialized"
        );
        Ok(Self::new(registry, SchemaValidator::new(schema), cfg.evaluation))
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn PipelineMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    pub fn validator(&self) -> &SchemaValidator {
        &self.validator
    }

    pub fn eval_config(&self) -> &EvalConfig {
        &self.eval_config
    }

    /// Transforms and validates one payload for `provider`.
    ///
    /// Every per-request failure is folded into the returned outcome.
    pub fn process(&self, provider: &str, payload: &Value) -> PipelineOutcome {
        let total = MetricsSpan::start(self.metrics.as_ref());
        let outcome = self.run(provider, payload);
        if let Some(span) = total {
            span.record_outcome(provider, &outcome);
        }
        outcome
    }

    fn run(&self, provider: &str, payload: &Value) -> PipelineOutcome {
        debug!(provider, state = "received", "pipeline run started");

        let expression = match self.registry.resolve(provider) {
            Ok(expression) => expression,
            Err(_) => {
                let failure = PipelineFailure::unknown_provider();
                warn!(provider, kind = %failure.kind, "pipeline run failed");
                return PipelineOutcome::Failed(failure);
            }
        };

        let mapping_span = MetricsSpan::start(self.metrics.as_ref());
        let candidate = match expression.evaluate(payload, &self.eval_config) {
            Ok(candidate) => {
                if let Some(span) = mapping_span {
                    span.record_mapping(provider, Ok(()));
                }
                candidate
            }
            Err(err) => {
                let failure = if err.is_timeout() {
                    PipelineFailure::timeout()
                } else {
                    PipelineFailure::evaluation()
                };
                warn!(provider, kind = %failure.kind, error = %err, "pipeline run failed");
                if let Some(span) = mapping_span {
                    span.record_mapping(provider, Err(err));
                }
                return PipelineOutcome::Failed(failure);
            }
        };
        debug!(provider, state = "mapped", "payload transformed");

        let validation_span = MetricsSpan::start(self.metrics.as_ref());
        let result = self.validator.validate(&candidate);
        if let Some(span) = validation_span {
            span.record_validation(provider, result.violations().len());
        }
        debug!(
            provider,
            state = "validated",
            violations = result.violations().len(),
            "record validated"
        );

        match (result, candidate) {
            (ValidationResult::Valid, Value::Object(fields)) => {
                PipelineOutcome::Succeeded(NormalizedRecord::new(fields))
            }
            (ValidationResult::Valid, _) => {
                PipelineOutcome::Rejected(vec![Violation::new("", "must be object")])
            }
            (ValidationResult::Invalid(violations), _) => PipelineOutcome::Rejected(violations),
        }
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("providers", &self.registry.keys())
            .field("eval_config", &self.eval_config)
            .field("metrics", &self.metrics.is_some())
            .finish()
    }
}
