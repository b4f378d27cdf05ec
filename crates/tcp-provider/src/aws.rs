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

/// Maps a capability type to its AWS resource type and the scheme its
/// simulated endpoint is synthesized under.
fn resource_type_for(capability_type: &str) -> Option<(&'static str, &'static str)> {
    match capability_type {
        "network" => Some(("aws.vpc", "vpc")),
        "container_runtime" => Some(("aws.eks", "eks")),
        "database" => Some(("aws.rds", "rds")),
        "cache" => Some(("aws.elasticache", "elasticache")),
        "queue" => Some(("aws.sqs", "sqs")),
        "object_storage" => Some(("aws.s3", "s3")),
        _ => None,
    }
}

fn required_parent_abstract_type(capability_type: &str) -> Option<&'static str> {
    match capability_type {
        "database" | "cache" | "queue" | "object_storage" => Some("container_runtime"),
        "container_runtime" => Some("network"),
        _ => None,
    }
}

/// A provider that simulates AWS-shaped infrastructure: it maps capabilities
/// onto the same resource types a real AWS backend would (`aws.vpc`,
/// `aws.eks`, `aws.rds`, ...) but every driver keeps synthetic state
/// in-memory instead of calling the AWS API. Reports [`FidelityLevel::Partial`]
/// — the resource taxonomy matches a real AWS deployment, but no actual AWS
/// resource is ever created, so constraints like service quotas, IAM, or
/// region-specific pricing are not enforced.
pub struct AwsProvider {
    drivers: BTreeMap<&'static str, Arc<InMemoryResourceDriver>>,
    mapper: AwsCapabilityMapper,
    credentials: Arc<InMemoryCredentialBroker>,
    store: Arc<dyn StateStore>,
}

impl AwsProvider {
    pub fn new() -> Self {
        let mut drivers: BTreeMap<&'static str, Arc<InMemoryResourceDriver>> = BTreeMap::new();
        for capability_type in ["network", "container_runtime", "database", "cache", "queue", "object_storage"] {
            let (resource_type, scheme) = resource_type_for(capability_type).expect("known capability type");
            drivers.insert(resource_type, Arc::new(InMemoryResourceDriver::new(resource_type, scheme)));
        }
        AwsProvider {
            drivers,
            mapper: AwsCapabilityMapper,
            credentials: Arc::new(InMemoryCredentialBroker::new("aws")),
            store: Arc::new(InMemoryStore::new()),
        }
    }
}

impl Default for AwsProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Provider for AwsProvider {
    fn name(&self) -> &str {
        "aws"
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
            FidelityLevel::Partial,
            vec![FidelityGap {
                field: "provider".to_string(),
                description: format!(
                    "aws provider simulates '{}' with the real AWS resource taxonomy but no live AWS API calls; quotas, IAM, and region pricing are not modeled",
                    capability_type
                ),
            }],
        )
    }

    fn resource_driver(&self, provider_type: &str) -> Result<Arc<dyn ResourceDriver>, DomainError> {
        self.drivers
            .get(provider_type)
            .map(|d| d.clone() as Arc<dyn ResourceDriver>)
            .ok_or_else(|| DomainError::ResourceDriverNotFound { provider_type: provider_type.to_string() })
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

/// Translates capability declarations into `aws.*` resource plans, wiring in
/// a dependency on the nearest matching parent output when the capability
/// type requires one (mirrors [`crate::local::LocalCapabilityMapper`]).
pub struct AwsCapabilityMapper;

#[async_trait]
impl CapabilityMapper for AwsCapabilityMapper {
    fn can_map(&self, capability_type: &str) -> bool {
        resource_type_for(capability_type).is_some()
    }

    async fn map(&self, decl: &CapabilityDeclaration, context: &PlatformContext) -> Result<Vec<ResourcePlan>, DomainError> {
        let Some((resource_type, _)) = resource_type_for(&decl.capability_type) else {
            return Err(DomainError::CapabilityUnsupported { capability_type: decl.capability_type.clone(), provider: "aws".to_string() });
        };

        let mut plan = ResourcePlan::new(&decl.name, resource_type, "aws");
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
}
