//! YAML configuration for the normalizer pipeline.
//!
//! One file describes where provider mappings live, which schema gates the
//! output and how long a single mapping may run.
//!
//! ## Example YAML Configuration
//!
//! ```yaml
//! version: "1.0"
//! name: "production"
//!
//! mappings_dir: "mappings"
//! mapping_extension: "map"
//!
//! # Omit to use the built-in normalized-record schema.
//! schema_path: "schemas/normalized-record.json"
//!
//! evaluation:
//!   timeout_ms: 1000
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use mapping::EvalConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Upper bound accepted for `evaluation.timeout_ms`.
pub const MAX_TIMEOUT_MS: u64 = 60_000;

/// Errors that can occur when loading YAML configuration files
#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("unsupported config version: {0}")]
    UnsupportedVersion(String),
}

/// Top-level pipeline configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PipelineConfig {
    /// Configuration format version
    #[serde(default = "default_version")]
    pub version: String,

    /// Optional configuration name/description
    #[serde(default)]
    pub name: Option<String>,

    /// Directory holding one `<provider>.<extension>` file per provider
    #[serde(default = "default_mappings_dir")]
    pub mappings_dir: PathBuf,

    #[serde(default = "default_mapping_extension")]
    pub mapping_extension: String,

    /// JSON schema file replacing the built-in record schema
    #[serde(default)]
    pub schema_path: Option<PathBuf>,

    #[serde(default)]
    pub evaluation: EvalConfig,
}

impl PipelineConfig {
    /// Load a YAML configuration file from the given path
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigLoadError> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse YAML configuration from a string
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigLoadError> {
        let config: PipelineConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Check version, extension and timeout bounds.
    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        match self.version.as_str() {
            "1.0" | "1" => Ok(()),
            v => Err(ConfigLoadError::UnsupportedVersion(v.to_string())),
        }?;

        if self.mapping_extension.is_empty() || self.mapping_extension.contains(['.', '/', '\\']) {
            return Err(ConfigLoadError::Validation(
                "mapping_extension must be a bare, non-empty extension".to_string(),
            ));
        }
        if self.evaluation.timeout_ms > MAX_TIMEOUT_MS {
            return Err(ConfigLoadError::Validation(format!(
                "evaluation.timeout_ms must be <= {MAX_TIMEOUT_MS}"
            )));
        }
        Ok(())
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            name: None,
            mappings_dir: default_mappings_dir(),
            mapping_extension: default_mapping_extension(),
            schema_path: None,
            evaluation: EvalConfig::default(),
        }
    }
}

fn default_version() -> String {
    "1.0".to_string()
}
fn default_mappings_dir() -> PathBuf {
    PathBuf::from("mappings")
}
fn default_mapping_extension() -> String {
    registry::DEFAULT_EXTENSION.to_string()
}
