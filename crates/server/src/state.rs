use crate::config::ServerConfig;
use crate::error::ServerResult;
use crate::metrics::PrometheusMetrics;
use metrics_exporter_prometheus::PrometheusHandle;
use normalizer::Pipeline;
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct ServerState {
    /// Server configuration
    pub config: Arc<ServerConfig>,

    /// Pipeline built once at startup; its registry never changes afterwards
    pub pipeline: Pipeline,

    /// Prometheus render handle, present when metrics are enabled
    pub metrics: Option<PrometheusHandle>,
}

impl ServerState {
    /// Build state from configuration, loading mappings and schema from disk.
    pub fn new(config: ServerConfig) -> ServerResult<Self> {
        let pipeline = Pipeline::from_config(&config.pipeline)?;
        let metrics = if config.metrics_enabled {
            crate::metrics::install_recorder()
        } else {
            None
        };
        Ok(Self::with_pipeline(config, pipeline, metrics))
    }

    /// Build state around an existing pipeline.
    ///
    /// When a handle is given the pipeline is wired to report into it.
    pub fn with_pipeline(
        config: ServerConfig,
        pipeline: Pipeline,
        metrics: Option<PrometheusHandle>,
    ) -> Self {
        let pipeline = if metrics.is_some() {
            pipeline.with_metrics(Arc::new(PrometheusMetrics))
        } else {
            pipeline
        };
        Self {
            config: Arc::new(config),
            pipeline,
            metrics,
        }
    }

    /// Number of registered providers
    pub fn provider_count(&self) -> usize {
        self.pipeline.registry().len()
    }
}
