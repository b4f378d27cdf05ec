use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tcp_context::PlatformContext;
use tcp_credentials::CredentialBroker;
use tcp_domain::{CapabilityDeclaration, Constraint, ConstraintViolation, DomainError, FidelityGap, FidelityLevel, PropertyValue};
use tcp_store::StateStore;

use crate::driver::ResourceDriver;

/// One provider-specific resource a [`CapabilityMapper`] wants created,
/// carrying any cross-tier dependency wiring the mapper inferred.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourcePlan {
    pub resource_name: String,
    pub resource_type: String,
    pub provider: String,
    #[serde(default)]
    pub properties: BTreeMap<String, PropertyValue>,
    #[serde(default, rename = "dependsOn")]
    pub depends_on: Vec<String>,
}

impl ResourcePlan {
    pub fn new(resource_name: impl Into<String>, resource_type: impl Into<String>, provider: impl Into<String>) -> Self {
        ResourcePlan {
            resource_name: resource_name.into(),
            resource_type: resource_type.into(),
            provider: provider.into(),
            properties: BTreeMap::new(),
            depends_on: Vec::new(),
        }
    }
}

/// Per-provider translation of capability declarations into
/// provider-specific [`ResourcePlan`]s.
#[async_trait]
pub trait CapabilityMapper: Send + Sync {
    fn can_map(&self, capability_type: &str) -> bool;

    /// Fails with [`DomainError::CapabilityUnsupported`] if `can_map` would
    /// have returned false. When the declaration needs outputs from a
    /// parent tier, scans `context.parent_outputs` for the first output
    /// whose abstract type matches what this capability requires and wires
    /// it into the returned plan's `depends_on`.
    async fn map(&self, decl: &CapabilityDeclaration, context: &PlatformContext) -> Result<Vec<ResourcePlan>, DomainError>;

    /// Non-fatal: returns every violation found rather than failing fast,
    /// leaving the decision of whether to reject to the caller.
    fn validate_constraints(&self, decl: &CapabilityDeclaration, constraints: &[Constraint]) -> Vec<ConstraintViolation> {
        tcp_domain::constraint::evaluate_all(constraints, &decl.properties)
    }
}

/// A pluggable cloud (or local/simulated) backend. Exposes everything the
/// planning pipeline needs: capability mapping, resource drivers, a
/// credential broker, and the state store it is configured against.
#[async_trait]
pub trait Provider: Send + Sync {
    fn name(&self) -> &str;
    fn version(&self) -> &str;

    async fn initialize(&self, config: &BTreeMap<String, PropertyValue>) -> Result<(), DomainError>;

    fn capabilities(&self) -> Vec<String>;

    async fn map_capability(&self, decl: &CapabilityDeclaration, context: &PlatformContext) -> Result<Vec<ResourcePlan>, DomainError>;

    /// How faithfully this provider actually provisions `capability_type`
    /// versus a real cloud implementation, and any known gaps. Defaults to
    /// [`FidelityLevel::Full`] with no gaps; stand-in or partially-simulated
    /// providers override this so planning can surface the shortfall instead
    /// of silently presenting simulated infrastructure as the real thing.
    fn fidelity(&self, capability_type: &str) -> (FidelityLevel, Vec<FidelityGap>) {
        let _ = capability_type;
        (FidelityLevel::Full, Vec::new())
    }

    /// Fails with [`DomainError::ResourceDriverNotFound`] when no driver is
    /// registered for `provider_type`.
    fn resource_driver(&self, provider_type: &str) -> Result<Arc<dyn ResourceDriver>, DomainError>;

    fn credential_broker(&self) -> Arc<dyn CredentialBroker>;

    fn state_store(&self) -> Arc<dyn StateStore>;

    async fn healthy(&self) -> bool;

    async fn close(&self) -> Result<(), DomainError>;
}
