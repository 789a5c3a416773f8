//! Startup loading of provider mappings from disk.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::RegistryError;
use crate::registry::{ProviderRegistry, RegistryBuilder};

/// File extension of mapping sources when none is configured.
pub const DEFAULT_EXTENSION: &str = "map";

/// Builds a registry from every `<provider>.<extension>` file in `dir`.
///
/// Files are processed in name order. Other files and subdirectories are
/// skipped. The load is all-or-nothing: the first unreadable file, invalid
/// key or compile error aborts it, so a process either starts with every
/// mapping or does not start.
pub fn load_dir(dir: impl AsRef<Path>, extension: &str) -> Result<ProviderRegistry, RegistryError> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
        return Err(RegistryError::MissingDirectory(dir.display().to_string()));
    }

    let mut sources = mapping_files(dir, extension)?;
    sources.sort();

    let mut builder = RegistryBuilder::new();
    for path in &sources {
        let Some(key) = path.file_stem().and_then(|stem| stem.to_str()) else {
            return Err(RegistryError::InvalidProviderKey(
                path.display().to_string(),
            ));
        };
        let source = fs::read_to_string(path).map_err(|e| io_error(path, e))?;
        builder.register_source(key, &source)?;
        debug!(provider = key, path = %path.display(), "loaded mapping");
    }

    let registry = builder.build();
    info!(
        dir = %dir.display(),
        providers = registry.len(),
        "provider registry loaded"
    );
    Ok(registry)
}

fn mapping_files(dir: &Path, extension: &str) -> Result<Vec<PathBuf>, RegistryError> {
    let entries = fs::read_dir(dir).map_err(|e| io_error(dir, e))?;
    let mut files = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| io_error(dir, e))?.path();
        let matches_extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext == extension);
        if matches_extension && path.is_file() {
            files.push(path);
        }
    }
    Ok(files)
}

fn io_error(path: &Path, err: std::io::Error) -> RegistryError {
    RegistryError::Io {
        path: path.display().to_string(),
        message: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write(dir: &Path, name: &str, contents: &str) {
        fs::write(dir.join(name), contents).unwrap();
    }

    #[test]
    fn loads_matching_files_only() {
        let dir = tempdir().unwrap();
        write(dir.path(), "stripe.map", r#"{"provider": "stripe"}"#);
        write(dir.path(), "paypal.map", r#"{"provider": "paypal"}"#);
        write(dir.path(), "README.md", "not a mapping");
        write(dir.path(), "stripe.map.bak", "{");
        fs::create_dir(dir.path().join("nested.map")).unwrap();

        let registry = load_dir(dir.path(), DEFAULT_EXTENSION).unwrap();
        let keys: Vec<&str> = registry.keys().into_iter().map(|k| k.as_str()).collect();
        assert_eq!(keys, ["paypal", "stripe"]);
    }

    #[test]
    fn custom_extension() {
        let dir = tempdir().unwrap();
        write(dir.path(), "adyen.jsonata", r#"{"provider": "adyen"}"#);
        write(dir.path(), "stripe.map", r#"{"provider": "stripe"}"#);

        let registry = load_dir(dir.path(), "jsonata").unwrap();
        assert_eq!(registry.len(), 1);
        assert!(registry.contains("adyen"));
    }

    #[test]
    fn empty_directory_is_an_empty_registry() {
        let dir = tempdir().unwrap();
        let registry = load_dir(dir.path(), DEFAULT_EXTENSION).unwrap();
        assert!(registry.is_empty());
    }

    #[test]
    fn missing_directory_is_an_error() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(matches!(
            load_dir(&missing, DEFAULT_EXTENSION),
            Err(RegistryError::MissingDirectory(_))
        ));
    }

    #[test]
    fn one_bad_mapping_fails_the_whole_load() {
        let dir = tempdir().unwrap();
        write(dir.path(), "adyen.map", r#"{"provider": "adyen"}"#);
        write(dir.path(), "broken.map", r#"{"provider": }"#);
        write(dir.path(), "stripe.map", r#"{"provider": "stripe"}"#);

        let err = load_dir(dir.path(), DEFAULT_EXTENSION).unwrap_err();
        assert!(matches!(err, RegistryError::Compile { ref provider, .. } if provider == "broken"));
    }

    #[test]
    fn invalid_file_stem_is_rejected() {
        let dir = tempdir().unwrap();
        write(dir.path(), "Stripe.map", r#"{"provider": "stripe"}"#);
        assert_eq!(
            load_dir(dir.path(), DEFAULT_EXTENSION).unwrap_err(),
            RegistryError::InvalidProviderKey("Stripe".into())
        );
    }
}
