use mapping::CompileError;
use thiserror::Error;

/// Errors raised while building or querying a provider registry.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum RegistryError {
    #[error("unknown provider '{0}'")]
    UnknownProvider(String),
    #[error("provider '{0}' is already registered")]
    DuplicateProvider(String),
    #[error("invalid provider key '{0}': expected lowercase letters, digits, '-' or '_'")]
    InvalidProviderKey(String),
    #[error("mapping for provider '{provider}' failed to compile: {source}")]
    Compile {
        provider: String,
        #[source]
        source: CompileError,
    },
    #[error("mapping directory {0} does not exist")]
    MissingDirectory(String),
    #[error("failed to read {path}: {message}")]
    Io { path: String, message: String },
}

impl RegistryError {
    pub fn is_unknown_provider(&self) -> bool {
        matches!(self, RegistryError::UnknownProvider(_))
    }
}
