use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tcp_context::PlatformContext;
use tcp_credentials::{CredentialBroker, InMemoryCredentialBroker};
use tcp_domain::{CapabilityDeclaration, DomainError, FidelityGap, FidelityLevel, PropertyValue};
use tcp_store::{InMemoryStore, StateStore};

use crate::driver::ResourceDriver;
use crate::provider::{CapabilityMapper, Provider, ResourcePlan};
use crate::sim::InMemoryResourceDriver;

const RESOURCE_TYPE: &str = "docker-compose.service";

/// A provider that simulates a single-host docker-compose deployment: every
/// mappable capability becomes one `docker-compose.service` entry, with no
/// distinction between a network, a database, or an application container —
/// compose has no native resource taxonomy for any of that. Reports
/// [`FidelityLevel::Stub`]: useful for exercising the planning and apply
/// pipeline end to end, but it does not model anything about how compose
/// actually behaves (volumes, networks, health checks are all ignored).
pub struct DockerComposeProvider {
    driver: Arc<InMemoryResourceDriver>,
    mapper: DockerComposeCapabilityMapper,
    credentials: Arc<InMemoryCredentialBroker>,
    store: Arc<dyn StateStore>,
}

impl DockerComposeProvider {
    pub fn new() -> Self {
        DockerComposeProvider {
            driver: Arc::new(InMemoryResourceDriver::new(RESOURCE_TYPE, "compose")),
            mapper: DockerComposeCapabilityMapper,
            credentials: Arc::new(InMemoryCredentialBroker::new("docker-compose")),
            store: Arc::new(InMemoryStore::new()),
        }
    }
}

impl Default for DockerComposeProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Provider for DockerComposeProvider {
    fn name(&self) -> &str {
        "docker-compose"
    }

    fn version(&self) -> &str {
        "1.0.0"
    }

    async fn initialize(&self, _config: &BTreeMap<String, PropertyValue>) -> Result<(), DomainError> {
        Ok(())
    }

    fn capabilities(&self) -> Vec<String> {
        vec!["container_runtime".to_string(), "database".to_string(), "cache".to_string()]
    }

    async fn map_capability(&self, decl: &CapabilityDeclaration, context: &PlatformContext) -> Result<Vec<ResourcePlan>, DomainError> {
        self.mapper.map(decl, context).await
    }

    fn fidelity(&self, capability_type: &str) -> (FidelityLevel, Vec<FidelityGap>) {
        (
            FidelityLevel::Stub,
            vec![FidelityGap {
                field: "provider".to_string(),
                description: format!(
                    "docker-compose provider flattens '{}' to a single generic service entry; no compose file is ever written or executed",
                    capability_type
                ),
            }],
        )
    }

    fn resource_driver(&self, provider_type: &str) -> Result<Arc<dyn ResourceDriver>, DomainError> {
        if provider_type == RESOURCE_TYPE {
            Ok(self.driver.clone())
        } else {
            Err(DomainError::ResourceDriverNotFound { provider_type: provider_type.to_string() })
        }
    }

    fn credential_broker(&self) -> Arc<dyn CredentialBroker> {
        self.credentials.clone()
    }

    fn state_store(&self) -> Arc<dyn StateStore> {
        self.store.clone()
    }

    async fn healthy(&self) -> bool {
        true
    }

    async fn close(&self) -> Result<(), DomainError> {
        Ok(())
    }
}

/// Translates every mappable capability into a single `docker-compose.service`
/// resource plan. Unlike [`crate::local::LocalCapabilityMapper`] and
/// [`crate::aws::AwsCapabilityMapper`], all capability types collapse onto
/// one resource type — compose has no native container-runtime/database
/// distinction.
pub struct DockerComposeCapabilityMapper;

#[async_trait]
impl CapabilityMapper for DockerComposeCapabilityMapper {
    fn can_map(&self, capability_type: &str) -> bool {
        matches!(capability_type, "container_runtime" | "database" | "cache")
    }

    async fn map(&self, decl: &CapabilityDeclaration, _context: &PlatformContext) -> Result<Vec<ResourcePlan>, DomainError> {
        if !self.can_map(&decl.capability_type) {
            return Err(DomainError::CapabilityUnsupported { capability_type: decl.capability_type.clone(), provider: "docker-compose".to_string() });
        }

        let mut plan = ResourcePlan::new(&decl.name, RESOURCE_TYPE, "docker-compose");
        plan.properties = decl.properties.clone();
        plan.depends_on = decl.depends_on.clone();
        Ok(vec![plan])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap as Map;
    use tcp_domain::Tier;

    fn empty_ctx() -> PlatformContext {
        PlatformContext {
            org: "acme".to_string(),
            env: "prod".to_string(),
            app: Some("web".to_string()),
            tier: Tier::Application,
            parent_outputs: Map::new(),
            constraints: Vec::new(),
            credentials: Map::new(),
            labels: Map::new(),
            annotations: Map::new(),
        }
    }

    #[tokio::test]
    async fn every_mappable_capability_collapses_to_one_resource_type() {
        let mapper = DockerComposeCapabilityMapper;
        for capability_type in ["container_runtime", "database", "cache"] {
            let decl = CapabilityDeclaration::new("svc", capability_type, Tier::Application);
            let plans = mapper.map(&decl, &empty_ctx()).await.unwrap();
            assert_eq!(plans[0].resource_type, RESOURCE_TYPE);
        }
    }

    #[tokio::test]
    async fn network_capability_is_unsupported() {
        let mapper = DockerComposeCapabilityMapper;
        let decl = CapabilityDeclaration::new("net", "network", Tier::Application);
        let err = mapper.map(&decl, &empty_ctx()).await.unwrap_err();
        assert!(matches!(err, DomainError::CapabilityUnsupported { .. }));
    }

    #[tokio::test]
    async fn provider_reports_stub_fidelity() {
        let provider = DockerComposeProvider::new();
        let (level, _) = provider.fidelity("database");
        assert_eq!(level, FidelityLevel::Stub);
    }
}
