use std::collections::HashMap;
use std::sync::Arc;

use mapping::{compile, CompiledExpression};
use tracing::debug;

use crate::error::RegistryError;
use crate::key::ProviderKey;

/// Mutable staging area for provider mappings.
///
/// Registration is fail-fast: a second mapping for the same key is a
/// configuration error, never a silent replace.
#[derive(Debug, Default, Clone)]
pub struct RegistryBuilder {
    entries: HashMap<ProviderKey, CompiledExpression>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        key: ProviderKey,
        expression: CompiledExpression,
    ) -> Result<&mut Self, RegistryError> {
        if self.entries.contains_key(&key) {
            return Err(RegistryError::DuplicateProvider(key.to_string()));
        }
        debug!(provider = %key, "registered provider mapping");
        self.entries.insert(key, expression);
        Ok(self)
    }

    /// Validates `key`, compiles `source` and registers the result.
    pub fn register_source(&mut self, key: &str, source: &str) -> Result<&mut Self, RegistryError> {
        let key = ProviderKey::new(key)?;
        if self.entries.contains_key(&key) {
            return Err(RegistryError::DuplicateProvider(key.to_string()));
        }
        let expression = compile(source).map_err(|source| RegistryError::Compile {
            provider: key.to_string(),
            source,
        })?;
        self.register(key, expression)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Freezes the builder. The result has no mutation API.
    pub fn build(self) -> ProviderRegistry {
        ProviderRegistry {
            entries: Arc::new(self.entries),
        }
    }
}

/// Frozen map from provider key to compiled mapping.
///
/// Clones share the same entries. Nothing can be added or removed after
/// [`RegistryBuilder::build`]; to change the provider set, build a new
/// registry with [`ProviderRegistry::to_builder`].
#[derive(Debug, Clone, Default)]
pub struct ProviderRegistry {
    entries: Arc<HashMap<ProviderKey, CompiledExpression>>,
}

impl ProviderRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Looks up the mapping for `key`. Exact, case-sensitive match.
    pub fn resolve(&self, key: &str) -> Result<&CompiledExpression, RegistryError> {
        self.entries
            .get(key)
            .ok_or_else(|| RegistryError::UnknownProvider(key.to_string()))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Registered provider keys, sorted.
    pub fn keys(&self) -> Vec<&ProviderKey> {
        let mut keys: Vec<&ProviderKey> = self.entries.keys().collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// A builder seeded with copies of this registry's entries.
    pub fn to_builder(&self) -> RegistryBuilder {
        RegistryBuilder {
            entries: (*self.entries).clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mapping::EvalConfig;
    use serde_json::json;

    fn sample() -> ProviderRegistry {
        let mut builder = RegistryBuilder::new();
        builder
            .register_source("stripe", r#"{"provider": "stripe"}"#)
            .unwrap()
            .register_source("paypal", r#"{"provider": "paypal"}"#)
            .unwrap();
        builder.build()
    }

    #[test]
    fn resolves_registered_providers() {
        let registry = sample();
        let program = registry.resolve("stripe").unwrap();
        let out = program.evaluate(&json!({}), &EvalConfig::default()).unwrap();
        assert_eq!(out, json!({"provider": "stripe"}));
        assert_eq!(registry.len(), 2);
        assert!(registry.contains("paypal"));
    }

    #[test]
    fn resolution_is_case_sensitive() {
        let registry = sample();
        assert_eq!(
            registry.resolve("Stripe").unwrap_err(),
            RegistryError::UnknownProvider("Stripe".into())
        );
        assert!(registry.resolve("nonexistent").unwrap_err().is_unknown_provider());
    }

    #[test]
    fn duplicate_registration_fails_fast() {
        let mut builder = RegistryBuilder::new();
        builder.register_source("stripe", "1").unwrap();
        assert_eq!(
            builder.register_source("stripe", "2").unwrap_err(),
            RegistryError::DuplicateProvider("stripe".into())
        );
        let key = ProviderKey::new("stripe").unwrap();
        let err = builder.register(key, compile("3").unwrap()).unwrap_err();
        assert_eq!(err, RegistryError::DuplicateProvider("stripe".into()));
        assert_eq!(builder.len(), 1);
    }

    #[test]
    fn compile_errors_name_the_provider() {
        let mut builder = RegistryBuilder::new();
        let err = builder.register_source("adyen", "$eval('x')").unwrap_err();
        assert!(matches!(err, RegistryError::Compile { ref provider, .. } if provider == "adyen"));
        assert!(builder.is_empty());
    }

    #[test]
    fn empty_registry_resolves_nothing() {
        let registry = RegistryBuilder::new().build();
        assert!(registry.is_empty());
        assert!(registry.keys().is_empty());
        assert!(registry.resolve("stripe").is_err());
    }

    #[test]
    fn keys_are_sorted() {
        let registry = sample();
        let keys: Vec<&str> = registry.keys().into_iter().map(|k| k.as_str()).collect();
        assert_eq!(keys, ["paypal", "stripe"]);
    }

    #[test]
    fn rebuilding_leaves_the_original_untouched() {
        let original = sample();
        let shared = original.clone();

        let mut builder = original.to_builder();
        builder.register_source("adyen", r#"{"provider": "adyen"}"#).unwrap();
        let extended = builder.build();

        assert_eq!(extended.len(), 3);
        assert_eq!(original.len(), 2);
        assert_eq!(shared.len(), 2);
        assert!(shared.resolve("adyen").is_err());
    }
}
