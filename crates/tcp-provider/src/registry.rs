use std::collections::HashMap;
use std::sync::Arc;

use tcp_domain::DomainError;

use crate::provider::Provider;

/// Dispatches capability mapping and resource operations to the correct
/// provider by name. Each provider type (`local`, `aws`, `docker-compose`,
/// ...) is registered once and looked up by the string every capability
/// declaration or resource record carries.
pub struct ProviderRegistry {
    pub default_provider: String,
    providers: HashMap<String, Arc<dyn Provider>>,
}

impl ProviderRegistry {
    pub fn new(default_provider: impl Into<String>) -> Self {
        ProviderRegistry { default_provider: default_provider.into(), providers: HashMap::new() }
    }

    /// Registers a provider under its own name. Returns `&mut self` for chaining.
    pub fn register(&mut self, provider: Arc<dyn Provider>) -> &mut Self {
        self.providers.insert(provider.name().to_string(), provider);
        self
    }

    /// Fails with [`DomainError::ResourceDriverNotFound`] if no provider is
    /// registered under `name`.
    pub fn get(&self, name: &str) -> Result<Arc<dyn Provider>, DomainError> {
        self.providers.get(name).cloned().ok_or_else(|| DomainError::ResourceDriverNotFound { provider_type: name.to_string() })
    }

    /// Resolves the provider for a capability declaration whose `provider`
    /// field is empty by falling back to [`default_provider`](Self::default_provider).
    pub fn resolve(&self, provider_name: Option<&str>) -> Result<Arc<dyn Provider>, DomainError> {
        match provider_name {
            Some(name) if !name.is_empty() => self.get(name),
            _ => self.get(&self.default_provider),
        }
    }

    pub fn registered_names(&self) -> Vec<String> {
        self.providers.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::local::LocalProvider;

    #[tokio::test]
    async fn resolves_default_when_no_name_given() {
        let mut registry = ProviderRegistry::new("local");
        registry.register(Arc::new(LocalProvider::new()));
        let provider = registry.resolve(None).unwrap();
        assert_eq!(provider.name(), "local");
    }

    #[tokio::test]
    async fn unknown_provider_fails() {
        let registry = ProviderRegistry::new("local");
        let err = registry.get("nonexistent").unwrap_err();
        assert!(matches!(err, DomainError::ResourceDriverNotFound { .. }));
    }
}
