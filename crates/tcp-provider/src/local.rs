use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::Utc;
use tcp_context::PlatformContext;
use tcp_credentials::{CredentialBroker, InMemoryCredentialBroker};
use tcp_domain::{CapabilityDeclaration, Constraint, ConstraintViolation, DiffEntry, DomainError, FidelityGap, FidelityLevel, PropertyValue, ResourceOutput, ResourceStatus};
use tcp_store::{InMemoryStore, StateStore};
use tracing::debug;

use crate::driver::{diff_properties, HealthCheckResult, ResourceDriver};
use crate::provider::{CapabilityMapper, Provider, ResourcePlan};

/// Capability types this provider maps, and the abstract type of the parent
/// resource each one depends on when present one tier up. A capability not
/// listed here has no implicit cross-tier dependency.
fn required_parent_abstract_type(capability_type: &str) -> Option<&'static str> {
    match capability_type {
        "database" | "cache" | "queue" | "object_storage" => Some("container_runtime"),
        "container_runtime" => Some("network"),
        _ => None,
    }
}

/// A stand-in backend that simulates infrastructure locally: it never makes
/// a network call, producing synthetic handles and `local://` endpoints
/// instead. Every resource type is served by the same generic driver.
pub struct LocalProvider {
    driver: Arc<LocalResourceDriver>,
    mapper: LocalCapabilityMapper,
    credentials: Arc<InMemoryCredentialBroker>,
    store: Arc<dyn StateStore>,
}

impl LocalProvider {
    pub fn new() -> Self {
        LocalProvider {
            driver: Arc::new(LocalResourceDriver::new()),
            mapper: LocalCapabilityMapper,
            credentials: Arc::new(InMemoryCredentialBroker::new("local")),
            store: Arc::new(InMemoryStore::new()),
        }
    }
}

impl Default for LocalProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Provider for LocalProvider {
    fn name(&self) -> &str {
        "local"
    }

    fn version(&self) -> &str {
        "1.0.0"
    }

    async fn initialize(&self, _config: &BTreeMap<String, PropertyValue>) -> Result<(), DomainError> {
        Ok(())
    }

    fn capabilities(&self) -> Vec<String> {
        vec![
            "network".to_string(),
            "container_runtime".to_string(),
            "database".to_string(),
            "cache".to_string(),
            "queue".to_string(),
            "object_storage".to_string(),
        ]
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
                    "local provider simulates '{}' with synthetic in-memory state; no real infrastructure is created",
                    capability_type
                ),
            }],
        )
    }

    fn resource_driver(&self, provider_type: &str) -> Result<Arc<dyn ResourceDriver>, DomainError> {
        if provider_type == self.driver.resource_type() {
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

/// Translates capability declarations into `local.*` resource plans,
/// wiring in a dependency on the nearest matching parent output when the
/// capability type requires one.
pub struct LocalCapabilityMapper;

#[async_trait]
impl CapabilityMapper for LocalCapabilityMapper {
    fn can_map(&self, capability_type: &str) -> bool {
        matches!(capability_type, "network" | "container_runtime" | "database" | "cache" | "queue" | "object_storage")
    }

    async fn map(&self, decl: &CapabilityDeclaration, context: &PlatformContext) -> Result<Vec<ResourcePlan>, DomainError> {
        if !self.can_map(&decl.capability_type) {
            return Err(DomainError::CapabilityUnsupported { capability_type: decl.capability_type.clone(), provider: "local".to_string() });
        }

        let mut plan = ResourcePlan::new(&decl.name, format!("local.{}", decl.capability_type), "local");
        plan.properties = decl.properties.clone();
        plan.depends_on = decl.depends_on.clone();

        if let Some(required_type) = required_parent_abstract_type(&decl.capability_type) {
            if let Some(parent) = context.parent_outputs.values().find(|o| o.abstract_type == required_type) {
                if !plan.depends_on.contains(&parent.name) {
                    plan.depends_on.push(parent.name.clone());
                }
            }
        }

        Ok(vec![plan])
    }

    fn validate_constraints(&self, decl: &CapabilityDeclaration, constraints: &[Constraint]) -> Vec<ConstraintViolation> {
        tcp_domain::constraint::evaluate_all(constraints, &decl.properties)
    }
}

/// One generic driver serving every `local.*` resource type by keeping
/// synthetic state in memory. No I/O, no persistence across process restarts.
pub struct LocalResourceDriver {
    resources: RwLock<BTreeMap<String, ResourceOutput>>,
}

impl LocalResourceDriver {
    pub fn new() -> Self {
        LocalResourceDriver { resources: RwLock::new(BTreeMap::new()) }
    }
}

impl Default for LocalResourceDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ResourceDriver for LocalResourceDriver {
    fn resource_type(&self) -> &str {
        "local"
    }

    async fn create(&self, name: &str, properties: &BTreeMap<String, PropertyValue>) -> Result<ResourceOutput, DomainError> {
        debug!(resource = name, "local driver: create");
        let mut output = ResourceOutput::new(name, "local.resource", "local", Utc::now());
        output.properties = properties.clone();
        output.endpoint = Some(format!("local://{}", name));
        output.status = ResourceStatus::Active;
        self.resources.write().expect("local driver lock poisoned").insert(name.to_string(), output.clone());
        Ok(output)
    }

    async fn read(&self, name: &str) -> Result<ResourceOutput, DomainError> {
        self.resources
            .read()
            .expect("local driver lock poisoned")
            .get(name)
            .cloned()
            .ok_or_else(|| DomainError::ResourceNotFound { context_path: "local".to_string(), name: name.to_string() })
    }

    async fn update(&self, name: &str, current: &ResourceOutput, desired: &BTreeMap<String, PropertyValue>) -> Result<ResourceOutput, DomainError> {
        let mut updated = current.clone();
        updated.properties = desired.clone();
        updated.status = ResourceStatus::Active;
        updated.last_synced = Utc::now();
        self.resources.write().expect("local driver lock poisoned").insert(name.to_string(), updated.clone());
        Ok(updated)
    }

    async fn delete(&self, name: &str) -> Result<(), DomainError> {
        self.resources.write().expect("local driver lock poisoned").remove(name);
        Ok(())
    }

    async fn health_check(&self, name: &str) -> HealthCheckResult {
        match self.resources.read().expect("local driver lock poisoned").get(name) {
            Some(_) => HealthCheckResult::healthy("simulated resource present"),
            None => HealthCheckResult::unhealthy("simulated resource not found"),
        }
    }

    async fn diff(&self, name: &str, desired: &BTreeMap<String, PropertyValue>) -> Result<Vec<DiffEntry>, DomainError> {
        let current = self.read(name).await?;
        Ok(diff_properties(&current.properties, desired))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tcp_domain::Tier;

    fn ctx_with_parent(abstract_type: &str) -> PlatformContext {
        let mut parent_outputs = BTreeMap::new();
        parent_outputs.insert("cluster".to_string(), ResourceOutput::new("cluster", abstract_type, "local.resource", Utc::now()));
        PlatformContext {
            org: "acme".to_string(),
            env: "prod".to_string(),
            app: Some("web".to_string()),
            tier: Tier::Application,
            parent_outputs,
            constraints: Vec::new(),
            credentials: BTreeMap::new(),
            labels: BTreeMap::new(),
            annotations: BTreeMap::new(),
        }
    }

    fn empty_ctx() -> PlatformContext {
        PlatformContext {
            org: "acme".to_string(),
            env: "prod".to_string(),
            app: Some("web".to_string()),
            tier: Tier::Application,
            parent_outputs: BTreeMap::new(),
            constraints: Vec::new(),
            credentials: BTreeMap::new(),
            labels: BTreeMap::new(),
            annotations: BTreeMap::new(),
        }
    }

    #[tokio::test]
    async fn map_database_wires_dependency_on_matching_parent_output() {
        let mapper = LocalCapabilityMapper;
        let decl = CapabilityDeclaration::new("db", "database", Tier::Application);
        let plans = mapper.map(&decl, &ctx_with_parent("container_runtime")).await.unwrap();
        assert_eq!(plans.len(), 1);
        assert!(plans[0].depends_on.contains(&"cluster".to_string()));
    }

    #[tokio::test]
    async fn map_without_matching_parent_leaves_depends_on_untouched() {
        let mapper = LocalCapabilityMapper;
        let decl = CapabilityDeclaration::new("db", "database", Tier::Application);
        let plans = mapper.map(&decl, &empty_ctx()).await.unwrap();
        assert!(plans[0].depends_on.is_empty());
    }

    #[tokio::test]
    async fn map_unsupported_capability_fails() {
        let mapper = LocalCapabilityMapper;
        let decl = CapabilityDeclaration::new("weird", "quantum_entangler", Tier::Application);
        let err = mapper.map(&decl, &empty_ctx()).await.unwrap_err();
        assert!(matches!(err, DomainError::CapabilityUnsupported { .. }));
    }

    #[tokio::test]
    async fn driver_create_then_read_round_trips() {
        let driver = LocalResourceDriver::new();
        let mut props = BTreeMap::new();
        props.insert("size".to_string(), PropertyValue::from("small"));
        let created = driver.create("db-1", &props).await.unwrap();
        assert_eq!(created.status, ResourceStatus::Active);
        let read_back = driver.read("db-1").await.unwrap();
        assert_eq!(read_back.endpoint, Some("local://db-1".to_string()));
    }

    #[tokio::test]
    async fn diff_reports_changed_properties() {
        let driver = LocalResourceDriver::new();
        let mut props = BTreeMap::new();
        props.insert("size".to_string(), PropertyValue::from("small"));
        driver.create("db-1", &props).await.unwrap();

        let mut desired = BTreeMap::new();
        desired.insert("size".to_string(), PropertyValue::from("large"));
        let diffs = driver.diff("db-1", &desired).await.unwrap();
        assert_eq!(diffs.len(), 1);
        assert_eq!(diffs[0].field, "size");
    }
}
